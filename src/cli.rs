//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags or environment
//! variables. The keyword and the API key are asked for interactively when
//! neither is given and stdin is a terminal.

use crate::api::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT};
use crate::browser::BrowserSettings;
use crate::cutoff::DEFAULT_WINDOW_DAYS;
use crate::scrapers::SourceId;
use clap::Parser;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_KEYWORD: &str = "AI";

/// Collect the last week of AI news, papers and forum posts.
///
/// # Examples
///
/// ```sh
/// # Everything, keyword and key from the environment or a prompt
/// ai_news_crawler
///
/// # Only the paper sources, headless, custom keyword
/// ai_news_crawler -k "diffusion" --sources huggingface,arxiv --headless
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic for the arXiv search and the synthesis report
    #[arg(short, long, env = "CRAWL_KEYWORD")]
    pub keyword: Option<String>,

    /// Perplexity API key; synthesis is skipped without one
    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Directory for the JSON report
    #[arg(short, long, default_value = "output/searcher")]
    pub output_dir: String,

    /// Length of the collection window in days
    #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
    pub window_days: i64,

    /// Page-scraping sources to run, in fixed order
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = SourceId::ALL)]
    pub sources: Vec<SourceId>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// Chrome/Chromium executable (discovered when omitted)
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_path: Option<PathBuf>,

    /// Chat-completions endpoint for synthesis
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub synthesis_endpoint: String,

    /// Model used for synthesis
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub synthesis_model: String,

    /// Per-call synthesis timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub synthesis_timeout_secs: u64,

    /// Skip the synthesis source entirely
    #[arg(long)]
    pub no_synthesis: bool,
}

impl Cli {
    /// Fill in the keyword and API key from stdin when running interactively.
    pub fn prompt_missing(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        self.fill_missing(interactive, &mut stdin.lock(), &mut io::stderr())
    }

    fn fill_missing<R: BufRead, W: Write>(
        &mut self,
        interactive: bool,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<()> {
        if self.keyword.is_none() {
            let answer = if interactive {
                ask(
                    &format!("Search keyword (default: {DEFAULT_KEYWORD}): "),
                    input,
                    output,
                )?
            } else {
                None
            };
            self.keyword = Some(answer.unwrap_or_else(|| DEFAULT_KEYWORD.to_string()));
        }
        if self.api_key.is_none() && interactive && !self.no_synthesis {
            self.api_key = ask("Perplexity API key (empty to skip synthesis): ", input, output)?;
        }
        Ok(())
    }

    pub fn keyword(&self) -> &str {
        self.keyword.as_deref().unwrap_or(DEFAULT_KEYWORD)
    }

    /// The key to use for synthesis, or `None` when synthesis is off.
    pub fn synthesis_key(&self) -> Option<&str> {
        if self.no_synthesis {
            return None;
        }
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            executable: self.chrome_path.clone(),
            headless: self.headless,
            ..BrowserSettings::default()
        }
    }
}

/// Print a question and read one trimmed line; blank or EOF is `None`.
fn ask<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> io::Result<Option<String>> {
    write!(output, "{question}")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let line = line.trim();
    Ok((!line.is_empty()).then(|| line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ai_news_crawler"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--keyword", "LLM", "--api-key", "k"]);
        assert_eq!(cli.output_dir, "output/searcher");
        assert_eq!(cli.window_days, 7);
        assert_eq!(cli.sources, SourceId::ALL.to_vec());
        assert_eq!(cli.synthesis_model, "sonar");
        assert_eq!(cli.synthesis_timeout(), Duration::from_secs(60));
        assert!(!cli.headless);
    }

    #[test]
    fn test_source_subset_and_short_flags() {
        let cli = parse(&["-k", "agents", "-o", "/tmp/out", "--sources", "arxiv,aitimes-kr", "--headless"]);
        assert_eq!(cli.keyword(), "agents");
        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.sources, vec![SourceId::Arxiv, SourceId::AitimesKr]);
        assert!(cli.browser_settings().headless);
    }

    #[test]
    fn test_non_interactive_defaults_keyword_and_skips_key() {
        let mut cli = parse(&["--api-key", ""]);
        cli.keyword = None;
        cli.fill_missing(false, &mut Cursor::new(""), &mut Vec::new())
            .unwrap();
        assert_eq!(cli.keyword(), "AI");
        assert_eq!(cli.synthesis_key(), None);
    }

    #[test]
    fn test_interactive_prompts_for_missing_values() {
        let mut cli = parse(&[]);
        cli.keyword = None;
        cli.api_key = None;
        let mut shown = Vec::new();
        cli.fill_missing(true, &mut Cursor::new("robotics\npplx-123\n"), &mut shown)
            .unwrap();
        assert_eq!(cli.keyword(), "robotics");
        assert_eq!(cli.synthesis_key(), Some("pplx-123"));
        assert!(String::from_utf8(shown).unwrap().contains("Search keyword"));
    }

    #[test]
    fn test_blank_answers_fall_back() {
        let mut cli = parse(&[]);
        cli.keyword = None;
        cli.api_key = None;
        cli.fill_missing(true, &mut Cursor::new("\n\n"), &mut Vec::new())
            .unwrap();
        assert_eq!(cli.keyword(), "AI");
        assert_eq!(cli.synthesis_key(), None);
    }

    #[test]
    fn test_no_synthesis_wins_over_key() {
        let cli = parse(&["--api-key", "pplx-123", "--no-synthesis"]);
        assert_eq!(cli.synthesis_key(), None);
    }
}
