#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Configuration for the batchd driver.

use clap::{
    Parser,
    builder::{
        Styles,
        styling::{AnsiColor, Color, Style},
    },
};

mod chain;
use chain::{L1Opts, L2Opts, RollupOpts};

mod batcher;
use batcher::BatcherOpts;

mod altda;
use altda::AltDaOpts;

mod operator;
use operator::OperatorOpts;

mod telemetry;
use telemetry::TelemetryOpts;

/// CLI options for the batchd driver.
#[derive(Debug, Clone, Parser)]
#[command(author, version, styles = cli_styles(), about)]
pub struct Opts {
    /// A unique name for this batchd instance, used in metrics and logs
    #[clap(long, env = "BATCHD_INSTANCE_NAME", default_value = "batchd")]
    pub instance_name: String,
    /// L1-related configuration options
    #[clap(flatten)]
    pub l1: L1Opts,
    /// L2-related configuration options
    #[clap(flatten)]
    pub l2: L2Opts,
    /// The immutable rollup configuration.
    #[clap(flatten)]
    pub rollup: RollupOpts,
    /// Batch-submission configuration options
    #[clap(flatten)]
    pub batcher: BatcherOpts,
    /// Alternative data-availability configuration options
    #[clap(flatten)]
    pub altda: AltDaOpts,
    /// Operator-related configuration options
    #[clap(flatten)]
    pub operator: OperatorOpts,
    /// Telemetry-related configuration options
    #[clap(flatten)]
    pub telemetry: TelemetryOpts,
}

/// Styles for the CLI.
const fn cli_styles() -> Styles {
    Styles::styled()
        .usage(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .header(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Yellow))))
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
        .valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}
