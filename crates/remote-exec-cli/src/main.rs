//! Attach the local terminal to a process on a remote target.
//!
//! Run with: remote-exec --addr 127.0.0.1:7000 --target web-3 -- /bin/sh
//!
//! Type `~.` at the start of a line to detach.

use std::{io::IsTerminal, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use remote_exec_core::StatusSink;
use remote_exec_session::{AttachConfig, ExecClient, LogStatus, TermStatus, parse_escape};
use remote_exec_terminal::LocalTerminal;
use remote_exec_transport::JsonLinesStream;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "remote-exec")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Exec endpoint to connect to (host:port).
    #[arg(short, long)]
    addr: String,

    /// Remote target to attach to.
    #[arg(short, long)]
    target: String,

    /// Name shown in status lines instead of the target id.
    #[arg(long)]
    label: Option<String>,

    /// Detach sequence, e.g. '\r~.' or '^]'.
    #[arg(short, long, conflicts_with = "no_escape")]
    escape: Option<String>,

    /// Never detach on local input.
    #[arg(long)]
    no_escape: bool,

    /// Terminal type to request instead of $TERM.
    #[arg(long)]
    term: Option<String>,

    /// JSON config file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Command and arguments to run on the target.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn attach_config(&self) -> anyhow::Result<AttachConfig> {
        let mut config = match &self.config {
            Some(path) => AttachConfig::from_json_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => AttachConfig::default(),
        };

        if let Some(escape) = &self.escape {
            config = config.with_escape(parse_escape(escape)?);
        }
        if self.no_escape {
            config = config.without_escape();
        }
        if let Some(label) = &self.label {
            config = config.with_label(label);
        }
        if let Some(term) = &self.term {
            config = config.with_term(term);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never mix with remote output.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            1
        }
    };

    // Exit directly: a pending stdin read would otherwise hold the runtime open.
    std::process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.attach_config()?;

    let stream = JsonLinesStream::connect(&cli.addr)
        .await
        .with_context(|| format!("connecting to {}", cli.addr))?;
    tracing::debug!(addr = %cli.addr, "Connected");

    // Progress goes to the log when stderr is redirected.
    let status: Box<dyn StatusSink> = if std::io::stderr().is_terminal() {
        Box::new(TermStatus::stderr())
    } else {
        Box::new(LogStatus)
    };

    let client = ExecClient::new(LocalTerminal::new(), cli.target, cli.args)
        .with_config(config)
        .with_status(status);

    let outcome = client
        .run(
            stream,
            tokio::io::stdin(),
            tokio::io::stdout(),
            CancellationToken::new(),
        )
        .await;

    Ok(outcome.into_result()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_trailing_command() {
        let cli = Cli::try_parse_from([
            "remote-exec",
            "--addr",
            "127.0.0.1:7000",
            "--target",
            "web-3",
            "--",
            "ls",
            "-la",
        ])
        .unwrap();
        assert_eq!(cli.target, "web-3");
        assert_eq!(cli.args, vec!["ls", "-la"]);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "remote-exec",
            "-a",
            "h:1",
            "-t",
            "web-3",
            "--escape",
            "^]",
            "--label",
            "web",
            "--term",
            "vt100",
        ])
        .unwrap();
        let config = cli.attach_config().unwrap();
        assert_eq!(config.escape, "\x1d");
        assert_eq!(config.label.as_deref(), Some("web"));
        assert_eq!(config.term.as_deref(), Some("vt100"));
    }

    #[test]
    fn test_no_escape() {
        let cli =
            Cli::try_parse_from(["remote-exec", "-a", "h:1", "-t", "x", "--no-escape"]).unwrap();
        assert!(cli.attach_config().unwrap().escape.is_empty());
    }

    #[test]
    fn test_escape_conflicts_with_no_escape() {
        let err = Cli::try_parse_from([
            "remote-exec",
            "-a",
            "h:1",
            "-t",
            "x",
            "--no-escape",
            "--escape",
            "~.",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_bad_escape_is_rejected() {
        let cli =
            Cli::try_parse_from(["remote-exec", "-a", "h:1", "-t", "x", "-e", "\\q"]).unwrap();
        assert!(cli.attach_config().is_err());
    }

    #[test]
    fn test_missing_target() {
        assert!(Cli::try_parse_from(["remote-exec", "-a", "h:1"]).is_err());
    }
}
