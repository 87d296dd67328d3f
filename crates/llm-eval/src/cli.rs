use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EvalMode {
    /// Replay recorded replies through the gateway.
    Mocked,
    /// Smoke-test flagged cases against the live service.
    Live,
}

impl EvalMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mocked => "mocked",
            Self::Live => "live",
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "llm-eval", about = "Fixture-driven checks for the generation gateway")]
pub struct CliOptions {
    #[arg(long, value_enum, default_value_t = EvalMode::Mocked)]
    pub mode: EvalMode,

    /// Run only the case with this id.
    #[arg(long = "case")]
    pub case_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{CliOptions, EvalMode};

    #[test]
    fn defaults_to_mocked_mode() {
        let options = CliOptions::try_parse_from(["llm-eval"]).expect("defaults should parse");
        assert_eq!(options.mode, EvalMode::Mocked);
        assert!(options.case_id.is_none());
    }

    #[test]
    fn parses_live_mode_and_case_filter() {
        let options =
            CliOptions::try_parse_from(["llm-eval", "--mode", "live", "--case", "almanac"])
                .expect("options should parse");
        assert_eq!(options.mode, EvalMode::Live);
        assert_eq!(options.case_id.as_deref(), Some("almanac"));
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(CliOptions::try_parse_from(["llm-eval", "--mode", "staging"]).is_err());
    }
}
