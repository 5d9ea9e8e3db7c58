use std::io::Write;

/// Installs the process-wide logger. `RUST_LOG` overrides the `info` default.
pub fn init(prefix: &'static str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                buf.timestamp(),
                record.level(),
                prefix,
                record.args()
            )
        })
        .init();
}
