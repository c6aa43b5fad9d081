fn main() {
    // Stamp the binary with its build date; override for reproducible builds.
    let stamp = std::env::var("PATHTRACE_BUILD_DATE").unwrap_or_else(|_| {
        let fmt = time::format_description::parse("[year]-[month]-[day] [hour]:[minute] UTC")
            .expect("valid date format");
        time::OffsetDateTime::now_utc()
            .format(&fmt)
            .unwrap_or_else(|_| "unknown".to_string())
    });
    println!("cargo:rustc-env=PATHTRACE_BUILD_DATE={stamp}");
}
