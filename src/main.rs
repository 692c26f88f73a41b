use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;

use sigcarve::devices::{device_selection_options, discover_block_devices, format_device_table};
use sigcarve::extract::extraction_cap;
use sigcarve::forensics::{self, CarveOutcome, CheckStatus};
use sigcarve::report::{summary_text, ReportGenerator, ReportOptions};
use sigcarve::source::SourceReader;
use sigcarve::testimage::write_test_image;
use sigcarve::utils::format_bytes;
use sigcarve::{CarveOptions, Carver};

const DETECTION_ROWS: usize = 20;

#[derive(Parser)]
#[command(name = "sigcarve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Signature-based file carving for disk images and block devices")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory JSON reports are written to
    #[arg(long, global = true, default_value = "reports")]
    report_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Detect signatures in the first megabyte of a source
    QuickScan { source: PathBuf },

    /// Carve every signature occurrence into a directory
    DeepCarve {
        source: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Describe a source, optionally carving it
    Analyze {
        source: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        carve_deleted: bool,
    },

    /// List the supported signatures
    Signatures,

    /// List block devices
    Devices,

    /// Check privileges, disk space and helper tools
    SystemInfo {
        #[arg(short, long, default_value = "recovered")]
        output: PathBuf,
    },

    /// Write a synthetic disk image with known signatures
    CreateTest {
        #[arg(default_value = "test_images/forensic_test.img")]
        path: PathBuf,
    },

    /// Menu-driven mode
    Interactive,
}

struct App {
    carver: Carver,
    reports: ReportGenerator,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let app = App {
        carver: Carver::new(CarveOptions::default()),
        reports: ReportGenerator::new(ReportOptions {
            report_dir: cli.report_dir,
        }),
    };

    match cli.command.unwrap_or(Command::Interactive) {
        Command::QuickScan { source } => app.quick_scan(&source),
        Command::DeepCarve { source, output } => app.deep_carve(&source, &output),
        Command::Analyze {
            source,
            output,
            carve_deleted,
        } => app.analyze(&source, &output, carve_deleted),
        Command::Signatures => {
            print_signatures(&app.carver);
            Ok(())
        }
        Command::Devices => {
            print_devices();
            Ok(())
        }
        Command::SystemInfo { output } => {
            print_system_info(&output);
            Ok(())
        }
        Command::CreateTest { path } => create_test(&path),
        Command::Interactive => app.interactive(),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

impl App {
    fn quick_scan(&self, source: &Path) -> Result<()> {
        println!(
            "\n{} {}",
            style("Quick scan of").cyan(),
            source.display()
        );

        let scan = self
            .carver
            .quick_scan(source)
            .with_context(|| format!("Quick scan failed: {}", source.display()))?;

        if scan.is_partial() {
            println!(
                "Scanned the first {} of {}",
                format_bytes(scan.bytes_scanned),
                format_bytes(scan.size_bytes)
            );
        }

        if scan.occurrences.is_empty() {
            println!("\n[!] {}", style("No signatures found.").yellow());
        } else {
            println!();
            println!("{:<12} {:<6} {:<10} {}", "OFFSET", "EXT", "TYPE", "DESCRIPTION");
            for detection in scan.occurrences.iter().take(DETECTION_ROWS) {
                println!(
                    "{:<12} {:<6} {:<10} {}",
                    format!("0x{:08x}", detection.offset),
                    detection.extension,
                    detection.category.as_str(),
                    detection.description
                );
            }
            if scan.occurrences.len() > DETECTION_ROWS {
                println!("... and {} more", scan.occurrences.len() - DETECTION_ROWS);
            }
        }

        let report = self.reports.quick_report(&scan, None);
        self.finish_report(&report)
    }

    fn deep_carve(&self, source: &Path, output: &Path) -> Result<()> {
        let size = SourceReader::open(source)
            .with_context(|| format!("Failed to open source: {}", source.display()))?
            .size();

        println!();
        println!("{}", style("Deep carve").cyan().bold());
        println!("Source: {} ({})", source.display(), format_bytes(size));
        println!("Output: {}", output.display());
        println!();

        let spinner = spinner("Scanning and extracting...")?;
        let result = self.carver.deep_carve(source, output);
        spinner.finish_and_clear();
        let result = result.with_context(|| format!("Deep carve failed: {}", source.display()))?;

        println!(
            "Recovered {} candidate files ({})",
            style(result.total_recovered).green().bold(),
            format_bytes(result.bytes_recovered())
        );
        for (category, count) in result.category_counts() {
            println!("  {:<12} {}", category, count);
        }

        let report = self.reports.carve_report(&result, source, size);
        self.finish_report(&report)
    }

    fn analyze(&self, source: &Path, output: &Path, carve_deleted: bool) -> Result<()> {
        let spinner = spinner("Analyzing source...")?;
        let analysis = forensics::analyze(&self.carver, source, output, carve_deleted);
        spinner.finish_and_clear();
        let analysis =
            analysis.with_context(|| format!("Analysis failed: {}", source.display()))?;

        let info = &analysis.source_info;
        println!();
        println!("{}", style("Source Information:").cyan().bold());
        println!("Path:     {}", info.path.display());
        println!("Size:     {} ({} bytes)", info.size_human, info.size_bytes);
        println!("Kind:     {}", source_kind(info.is_file, info.is_block_device));
        if let Some(modified) = &info.modified {
            println!("Modified: {}", modified);
        }
        if let Some(file_type) = &analysis.file_type {
            println!("Content:  {}", file_type);
        }
        println!("Tools:    {}", analysis.tools_available.join(", "));

        match &analysis.deleted_files {
            Some(CarveOutcome::Completed(result)) => println!(
                "\nDeleted-file carving recovered {} candidates into {}",
                style(result.total_recovered).green().bold(),
                result.output_directory.display()
            ),
            Some(CarveOutcome::Unsupported { reason }) => {
                println!("\n[!] {}", style(reason).yellow())
            }
            None => {}
        }

        let report = self.reports.forensic_report(&analysis);
        self.finish_report(&report)
    }

    fn finish_report(&self, report: &sigcarve::Report) -> Result<()> {
        let written = self
            .reports
            .write(report)
            .context("Failed to write report")?;

        println!();
        print!("{}", summary_text(report));
        println!(
            "{} {}",
            style("Report saved:").green(),
            written.json.display()
        );
        if let Some(yaml) = &written.yaml {
            println!("{} {}", style("YAML copy:").green(), yaml.display());
        }
        Ok(())
    }

    fn interactive(&self) -> Result<()> {
        print_banner();

        let theme = ColorfulTheme::default();
        let items = [
            "Quick scan",
            "Deep carve",
            "Forensic analysis",
            "Supported signatures",
            "Block devices",
            "System readiness",
            "Create test image",
            "Exit",
        ];

        loop {
            println!();
            let choice = Select::with_theme(&theme)
                .with_prompt("What do you want to do?")
                .items(&items)
                .default(0)
                .interact()
                .context("Failed to read menu selection")?;

            let outcome = match choice {
                0 => select_source(&theme).and_then(|s| self.quick_scan(&s)),
                1 => select_source(&theme).and_then(|s| {
                    let output = prompt_output(&theme)?;
                    if confirm(&theme, "Start deep carve?")? {
                        self.deep_carve(&s, &output)
                    } else {
                        Ok(())
                    }
                }),
                2 => select_source(&theme).and_then(|s| {
                    let output = prompt_output(&theme)?;
                    let carve = confirm(&theme, "Carve deleted files as well?")?;
                    self.analyze(&s, &output, carve)
                }),
                3 => {
                    print_signatures(&self.carver);
                    Ok(())
                }
                4 => {
                    print_devices();
                    Ok(())
                }
                5 => prompt_output(&theme).map(|output| print_system_info(&output)),
                6 => prompt_test_path(&theme).and_then(|p| create_test(&p)),
                _ => break,
            };

            if let Err(e) = outcome {
                println!("\n[!] {}", style(format!("{:#}", e)).red());
            }
        }

        println!("\nGoodbye.");
        Ok(())
    }
}

fn select_source(theme: &ColorfulTheme) -> Result<PathBuf> {
    let devices = discover_block_devices();
    let mut options = device_selection_options(&devices);
    options.push("Enter a path manually".to_string());

    let selection = Select::with_theme(theme)
        .with_prompt("Select source")
        .items(&options)
        .default(options.len() - 1)
        .interact()
        .context("Failed to select source")?;

    if let Some(device) = devices.get(selection) {
        return Ok(PathBuf::from(&device.path));
    }

    let path: String = Input::with_theme(theme)
        .with_prompt("Path to image file or device")
        .interact_text()
        .context("Failed to read source path")?;
    Ok(PathBuf::from(path))
}

fn prompt_output(theme: &ColorfulTheme) -> Result<PathBuf> {
    let output: String = Input::with_theme(theme)
        .with_prompt("Where do you want to save the recovered files?")
        .default("./recovered".to_string())
        .interact_text()
        .context("Failed to get output directory")?;
    Ok(PathBuf::from(output))
}

fn prompt_test_path(theme: &ColorfulTheme) -> Result<PathBuf> {
    let path: String = Input::with_theme(theme)
        .with_prompt("Where should the test image go?")
        .default("test_images/forensic_test.img".to_string())
        .interact_text()
        .context("Failed to read test image path")?;
    Ok(PathBuf::from(path))
}

fn confirm(theme: &ColorfulTheme, prompt: &str) -> Result<bool> {
    Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(true)
        .interact()
        .context("Failed to confirm")
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

fn print_signatures(carver: &Carver) {
    let table = carver.table();
    println!();
    println!(
        "{}",
        style(format!("Supported signatures ({})", table.len())).green().bold()
    );
    println!();
    println!(
        "{:<6} {:<11} {:<18} {:>10}  {}",
        "EXT", "TYPE", "SIGNATURE", "MAX SIZE", "DESCRIPTION"
    );
    for entry in table.entries() {
        println!(
            "{:<6} {:<11} {:<18} {:>10}  {}",
            entry.extension(),
            entry.category().as_str(),
            entry.pattern_hex(),
            format_bytes(extraction_cap(entry)),
            entry.description()
        );
    }
}

fn print_devices() {
    let devices = discover_block_devices();
    println!();
    if devices.is_empty() {
        println!(
            "[!] {}",
            style("No block devices found. Are you running as root?").yellow()
        );
        return;
    }
    println!("{}", style("Found Devices:").green().bold());
    println!();
    print!("{}", format_device_table(&devices));
}

fn print_system_info(output: &Path) {
    println!();
    println!("{}", style("System Readiness:").cyan().bold());
    println!(
        "Platform: {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    for check in forensics::readiness(output) {
        let status = match check.status {
            CheckStatus::Pass => style(format!("{:<8}", "PASS")).green(),
            CheckStatus::Warning => style(format!("{:<8}", "WARNING")).yellow(),
            CheckStatus::Fail => style(format!("{:<8}", "FAIL")).red(),
        };
        println!("{:<16} {} {}", check.name, status, check.message);
    }
}

fn create_test(path: &Path) -> Result<()> {
    let image = write_test_image(path)
        .with_context(|| format!("Failed to create test image: {}", path.display()))?;
    println!(
        "\n{} {}",
        style("Created test image:").green(),
        path.display()
    );
    println!("Size: {} bytes", image.data.len());
    println!("Planted signatures: {}", image.planted.len());
    Ok(())
}

fn source_kind(is_file: bool, is_block_device: bool) -> &'static str {
    match (is_file, is_block_device) {
        (true, _) => "regular file",
        (_, true) => "block device",
        _ => "other",
    }
}

fn print_banner() {
    println!();
    println!("{}", style("sigcarve - Signature Carving Tool").cyan().bold());
}
