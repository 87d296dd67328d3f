use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use studio_core::llm::ContentKind;

#[derive(Debug, Parser)]
#[command(
    name = "studio",
    version,
    about = "Generate structured devotional and astrological content"
)]
pub struct Cli {
    /// API key to use for this invocation, ahead of any saved or ambient key.
    #[arg(long, global = true)]
    pub key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate one piece of content and print it as JSON.
    Generate(GenerateArgs),
    /// Check that the active API key is usable.
    Probe(ProbeArgs),
    /// Manage the saved API key.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// daily-almanac, birth-chart, numerology, zodiac-prediction, topical-post, dilemma-resolution
    #[arg(long, value_parser = parse_kind)]
    pub kind: ContentKind,

    /// Topic for posts, or the question for dilemma resolution.
    #[arg(long, default_value = "")]
    pub topic: String,

    #[arg(long)]
    pub category: Option<String>,

    /// Ask for a Sanskrit verse alongside the content.
    #[arg(long)]
    pub verse: bool,

    /// Long-form output instead of story-sized text.
    #[arg(long)]
    pub long: bool,

    /// Route to the slower, higher-quality model.
    #[arg(long)]
    pub quality: bool,

    /// Extra locale or style instructions.
    #[arg(long)]
    pub locale: Option<String>,

    #[arg(long)]
    pub name: Option<String>,

    /// Date as YYYY-MM-DD (almanac day, birth date or date of birth).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Birth time as HH:MM.
    #[arg(long, value_parser = parse_time)]
    pub time: Option<NaiveTime>,

    #[arg(long)]
    pub place: Option<String>,

    /// Zodiac sign for predictions.
    #[arg(long)]
    pub sign: Option<String>,

    /// Prediction period, for example "today" or "this week".
    #[arg(long)]
    pub period: Option<String>,

    /// Additional context as label=value; may be repeated.
    #[arg(long = "detail", value_parser = parse_detail)]
    pub details: Vec<(String, String)>,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Repeat the probe every N seconds until interrupted.
    #[arg(long)]
    pub every: Option<u64>,
}

#[derive(Debug, Subcommand)]
pub enum KeyAction {
    /// Verify and save a key for later invocations.
    Save {
        value: String,
        /// Save without probing the key first.
        #[arg(long)]
        no_verify: bool,
    },
    /// Remove the saved key.
    Clear,
    /// Show which key would be used, masked.
    Show,
}

fn parse_kind(value: &str) -> Result<ContentKind, String> {
    ContentKind::parse(value).ok_or_else(|| {
        let known = ContentKind::ALL
            .iter()
            .map(|kind| kind.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown content kind `{value}` (expected one of: {known})")
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("invalid date `{value}`: {err}"))
}

fn parse_time(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|err| format!("invalid time `{value}`: {err}"))
}

fn parse_detail(value: &str) -> Result<(String, String), String> {
    let (label, detail) = value
        .split_once('=')
        .ok_or_else(|| format!("detail `{value}` must look like label=value"))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("detail `{value}` has an empty label"));
    }
    Ok((label.to_string(), detail.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use studio_core::llm::ContentKind;

    use super::{Cli, Command, KeyAction};

    #[test]
    fn parses_generate_with_flags_and_details() {
        let cli = Cli::try_parse_from([
            "studio",
            "generate",
            "--kind",
            "topical_post",
            "--topic",
            "Karma",
            "--verse",
            "--quality",
            "--detail",
            "Audience=students",
        ])
        .expect("arguments should parse");

        let Command::Generate(args) = cli.command else {
            panic!("expected generate command");
        };
        assert_eq!(args.kind, ContentKind::TopicalPost);
        assert_eq!(args.topic, "Karma");
        assert!(args.verse);
        assert!(args.quality);
        assert!(!args.long);
        assert_eq!(
            args.details,
            vec![("Audience".to_string(), "students".to_string())]
        );
    }

    #[test]
    fn global_key_is_accepted_after_subcommand() {
        let cli = Cli::try_parse_from(["studio", "probe", "--key", "typed-key", "--every", "30"])
            .expect("arguments should parse");

        assert_eq!(cli.key.as_deref(), Some("typed-key"));
        assert!(matches!(cli.command, Command::Probe(ref args) if args.every == Some(30)));
    }

    #[test]
    fn rejects_unknown_kind_and_bad_dates() {
        assert!(Cli::try_parse_from(["studio", "generate", "--kind", "tarot"]).is_err());
        assert!(
            Cli::try_parse_from([
                "studio",
                "generate",
                "--kind",
                "numerology",
                "--date",
                "17/08/1994"
            ])
            .is_err()
        );
        assert!(
            Cli::try_parse_from([
                "studio",
                "generate",
                "--kind",
                "topical-post",
                "--detail",
                "no-separator"
            ])
            .is_err()
        );
    }

    #[test]
    fn parses_key_save_without_verification() {
        let cli = Cli::try_parse_from(["studio", "key", "save", "AIzaExample", "--no-verify"])
            .expect("arguments should parse");

        assert!(matches!(
            cli.command,
            Command::Key {
                action: KeyAction::Save {
                    ref value,
                    no_verify: true
                }
            } if value == "AIzaExample"
        ));
    }
}
