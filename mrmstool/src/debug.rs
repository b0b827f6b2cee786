use tracing_subscriber::EnvFilter;

#[derive(clap::Args, Debug, Clone)]
pub struct DebugArgs {
    /// More output. Once logs every frame, twice logs everything.
    /// RUST_LOG overrides this.
    #[arg(short, long, action=clap::ArgAction::Count)]
    pub debug: u8,
}

impl DebugArgs {
    /// Log every frame on the link at info.
    pub fn verbose(&self) -> bool {
        self.debug >= 1
    }

    fn level(&self) -> &'static str {
        match self.debug {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level()))
    }

    /// Send logs to stderr. Call this once, first thing.
    pub fn init(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(self.filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn levels() {
        let args = |debug| DebugArgs { debug };
        assert_eq!(args(0).level(), "info");
        assert!(!args(0).verbose());
        assert_eq!(args(1).level(), "debug");
        assert!(args(1).verbose());
        assert_eq!(args(5).level(), "trace");
    }
}
