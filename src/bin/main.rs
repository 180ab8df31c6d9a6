use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, error, info, LevelFilter};
use resumesite::config::{self, ConfigSource, SiteConfig};
use resumesite::{ConversionSummary, SiteError};
use std::process;

#[derive(Debug)]
enum AppError {
    Site(SiteError),
}

impl From<SiteError> for AppError {
    fn from(e: SiteError) -> Self {
        AppError::Site(e)
    }
}

/// Verbosity level for output
#[derive(Debug, Clone, Copy, PartialEq)]
enum Verbosity {
    Quiet,   // No output except errors
    Normal,  // Standard output
    Verbose, // Detailed output
}

impl Verbosity {
    fn from_matches(matches: &ArgMatches) -> Self {
        if matches.get_flag("quiet") {
            Verbosity::Quiet
        } else if matches.get_flag("verbose") {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    fn log_level(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Normal => LevelFilter::Info,
            Verbosity::Verbose => LevelFilter::Debug,
        }
    }
}

/// Loads the configuration.
///
/// Priority order:
/// 1. `--config <file>`, which must exist and parse
/// 2. `resumesiterc.toml` in the current directory
/// 3. `<config dir>/resumesite/config.toml`
/// 4. built-in defaults
fn load_config(matches: &ArgMatches) -> Result<SiteConfig, AppError> {
    if let Some(path) = matches.get_one::<String>("config") {
        debug!("Using configuration {}", path);
        return Ok(config::read_config_file(path)?);
    }
    Ok(match config::discover_config_file(None) {
        Some(path) => {
            let path = path.to_string_lossy().to_string();
            debug!("Using configuration {}", path);
            config::load_config_from_source(ConfigSource::File(&path))
        }
        None => config::load_config_from_source(ConfigSource::Default),
    })
}

fn arg_or<'a>(matches: &'a ArgMatches, id: &str, default: &'a str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or(default)
}

fn print_conversion_summary(summary: &ConversionSummary) {
    let rule = "=".repeat(50);
    println!();
    println!("{}", rule);
    if summary.written {
        println!("✨ SUCCESS! Resume converted successfully");
    } else {
        println!("✨ DRY RUN COMPLETE - conversion would succeed");
    }
    println!("{}", rule);
    let location = if summary.location.is_empty() {
        "(not set)"
    } else {
        summary.location.as_str()
    };
    println!("  📍 Location: {}", location);
    println!("  📝 Summary: {} paragraph(s)", summary.summary_paragraphs);
    println!("  💼 Work Experience: {} job(s)", summary.jobs);
    println!("  🛠️  Skills: {} item(s)", summary.skills);
    println!("  🎓 Education: {} school(s)", summary.schools);
    println!("  📜 Certifications: {} item(s)", summary.certifications);
    if summary.written {
        println!("  💾 Output: {} bytes", summary.bytes);
    } else {
        println!("  💾 Output: {} bytes (not written)", summary.bytes);
    }
    println!("  🔖 Build: {} {}", summary.stamp.revision, summary.stamp.timestamp);
    println!("{}", rule);
}

fn run_convert(
    matches: &ArgMatches,
    config: &SiteConfig,
    verbosity: Verbosity,
) -> Result<(), AppError> {
    let dry_run = matches.get_flag("dry-run");
    let markdown = arg_or(matches, "markdown", &config.paths.markdown);
    let template = arg_or(matches, "template", &config.paths.html);

    if dry_run && verbosity != Verbosity::Quiet {
        println!("🔍 DRY RUN MODE - no files will be written\n");
    }
    info!("Converting {} into {}", markdown, template);

    let summary =
        resumesite::convert_files(markdown, template, &config.build.revision_env, dry_run)?;

    if verbosity != Verbosity::Quiet {
        print_conversion_summary(&summary);
    }
    Ok(())
}

fn run_validate(
    matches: &ArgMatches,
    config: &SiteConfig,
    verbosity: Verbosity,
) -> Result<(), AppError> {
    let markdown = arg_or(matches, "markdown", &config.paths.markdown);
    let quiet = verbosity == Verbosity::Quiet;
    if !quiet {
        println!("🔍 Validating {}...\n", markdown);
    }

    let (report, stats) = resumesite::validate_file(markdown)?;

    if !report.is_valid() && !quiet {
        println!("❌ VALIDATION FAILED\n");
        println!("Errors:");
        for e in &report.errors {
            println!("  • {}", e);
        }
        println!();
    }
    resumesite::ensure_valid(&report)?;

    if quiet {
        return Ok(());
    }
    if report.warnings.is_empty() {
        println!("✅ VALIDATION PASSED\n");
    } else {
        println!("⚠️  VALIDATION PASSED WITH WARNINGS\n");
        println!("Warnings (non-blocking):");
        for w in &report.warnings {
            println!("  • {}", w);
        }
        println!();
    }

    println!("Resume Summary:");
    println!("  • Total lines: {}", stats.total_lines);
    println!("  • Sections: {}", stats.sections);
    println!("  • File size: {} bytes", stats.bytes);
    Ok(())
}

#[cfg(feature = "pdf")]
fn run_pdf(
    matches: &ArgMatches,
    config: &SiteConfig,
    verbosity: Verbosity,
) -> Result<(), AppError> {
    use std::path::Path;

    let html = arg_or(matches, "template", &config.paths.html);
    let output = arg_or(matches, "output", &config.paths.pdf);

    info!("Generating PDF from {}", html);
    let report = resumesite::pdf::generate_pdf(&config.pdf, Path::new(html), Path::new(output))?;
    if !report.ready {
        log::warn!("Page readiness check timed out; the PDF may be incomplete");
    }

    if verbosity != Verbosity::Quiet {
        println!("✅ PDF generated using headless Chrome: {}", output);
        if verbosity == Verbosity::Verbose {
            let size_kb = report.bytes as f64 / 1024.0;
            println!("   Source: {}", report.url);
            println!("   Size: {:.1} KB", size_kb);
        }
    }
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<(), AppError> {
    let verbosity = Verbosity::from_matches(matches);
    let config = load_config(matches)?;

    match matches.subcommand() {
        Some(("convert", sub)) => run_convert(sub, &config, verbosity),
        Some(("validate", sub)) => run_validate(sub, &config, verbosity),
        #[cfg(feature = "pdf")]
        Some(("pdf", sub)) => run_pdf(sub, &config, verbosity),
        _ => Ok(()),
    }
}

fn markdown_arg() -> Arg {
    Arg::new("markdown")
        .short('m')
        .long("markdown")
        .value_name("FILE")
        .help("Résumé markdown file (defaults to paths.markdown, resume.md)")
}

fn template_arg(help: &'static str) -> Arg {
    Arg::new("template")
        .short('t')
        .long("template")
        .value_name("FILE")
        .help(help)
}

fn build_cli() -> Command {
    let cmd = Command::new("resumesite")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Build a résumé web page (and PDF) from a markdown file")
        .after_help(
            "EXAMPLES:\n  \
            resumesite validate\n  \
            resumesite convert --dry-run\n  \
            resumesite convert -m cv.md -t site/index.html\n  \
            resumesite pdf -o resume.pdf\n",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("CONFIG_FILE")
                .global(true)
                .help("Path to configuration file (TOML format). Auto-detects resumesiterc.toml if not specified"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Show detailed output")
                .action(ArgAction::SetTrue)
                .conflicts_with("quiet"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .global(true)
                .help("Suppress all output except errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("get-default-configuration")
                .long("get-default-configuration")
                .help("Print a default resumesiterc.toml to stdout and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("convert")
                .about("Regenerate the HTML page from the markdown")
                .arg(markdown_arg())
                .arg(template_arg(
                    "HTML template, rewritten in place (defaults to paths.html, index.html)",
                ))
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .help("Parse and render without writing the HTML file")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check the markdown for required sections and formatting issues")
                .arg(markdown_arg()),
        );

    #[cfg(feature = "pdf")]
    let cmd = cmd.subcommand(
        Command::new("pdf")
            .about("Print the generated page to PDF with headless Chrome")
            .arg(template_arg(
                "Generated HTML page (defaults to paths.html, index.html)",
            ))
            .arg(
                Arg::new("output")
                    .short('o')
                    .long("output")
                    .value_name("OUTPUT_PATH")
                    .help("Path to the output PDF file (defaults to paths.pdf, resume.pdf)"),
            ),
    );

    cmd
}

fn main() {
    let mut cmd = build_cli();
    let matches = cmd.clone().get_matches();

    // RUST_LOG still wins over the verbosity flags
    env_logger::Builder::new()
        .filter_level(Verbosity::from_matches(&matches).log_level())
        .parse_default_env()
        .format_timestamp_millis()
        .init();

    if matches.get_flag("get-default-configuration") {
        println!("{}", config::default_config_toml());
        process::exit(0);
    }

    if matches.subcommand_name().is_none() {
        let _ = cmd.print_help();
        println!();
        process::exit(1);
    }

    if let Err(e) = run(&matches) {
        match e {
            AppError::Site(e) => error!("{}", e),
        }
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_convert_arguments() {
        let matches = build_cli()
            .try_get_matches_from(["resumesite", "convert", "--dry-run", "-m", "cv.md"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "convert");
        assert!(sub.get_flag("dry-run"));
        assert_eq!(arg_or(sub, "markdown", "resume.md"), "cv.md");
        assert_eq!(arg_or(sub, "template", "index.html"), "index.html");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["resumesite", "validate", "-q"])
            .unwrap();
        assert_eq!(Verbosity::from_matches(&matches), Verbosity::Quiet);
        assert_eq!(Verbosity::Quiet.log_level(), LevelFilter::Error);
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(build_cli()
            .try_get_matches_from(["resumesite", "-v", "-q", "validate"])
            .is_err());
    }

    #[test]
    fn test_load_config_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "[paths]\nmarkdown = \"cv.md\"\n").unwrap();

        let matches = build_cli()
            .try_get_matches_from(["resumesite", "-c", path.to_str().unwrap(), "validate"])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.paths.markdown, "cv.md");
    }

    #[test]
    fn test_load_config_explicit_missing_file_fails() {
        let matches = build_cli()
            .try_get_matches_from(["resumesite", "-c", "no-such-config.toml", "validate"])
            .unwrap();
        match load_config(&matches) {
            Err(AppError::Site(SiteError::ConfigError { message, .. })) => {
                assert!(message.contains("no-such-config.toml"))
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_missing_sections_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("resume.md");
        fs::write(&path, "## Skills\n- Rust\n").unwrap();

        let matches = build_cli()
            .try_get_matches_from(["resumesite", "validate", "-q", "-m", path.to_str().unwrap()])
            .unwrap();
        match run(&matches) {
            Err(AppError::Site(SiteError::ValidationError { errors })) => {
                assert_eq!(errors.len(), 3)
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }
}
