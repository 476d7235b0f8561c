use clap::Parser;
use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use finance_chat::{
    chart::{self, DEFAULT_HEIGHT, DEFAULT_WIDTH},
    config::{Settings, SUPPORT_PHONE_NUMBER},
    conversation::{Session, TurnController, TurnReport, TRANSCRIPT_FILE_NAME},
    Role, TurnDisplay,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Terminal chat for stock prices, price histories, financial news and exchange rates
#[derive(Debug, Parser)]
#[command(name = "finance-chat", version)]
struct Args {
    /// Key=value configuration file (overrides the environment)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Width of the price chart in terminal cells
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    chart_width: u16,

    /// Height of the price chart in terminal rows
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    chart_height: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with answers.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let settings = Settings::load(args.config.as_deref())?;
    let controller = TurnController::from_settings(&settings)?;
    let mut session = Session::new();

    info!(session_id = %session.session_id, "Finance chat starting");
    print_banner();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stderr = io::stderr();

    loop {
        print!("{} ", "🗨️  Enter your question here:".bold());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/history" => {
                print_history(&session);
                continue;
            }
            _ => {}
        }

        if let Some(rest) = input
            .strip_prefix("/download")
            .filter(|rest| rest.is_empty() || rest.starts_with(' '))
        {
            download(&session, rest.trim());
            continue;
        }

        eprint!("{}", "⏳ Generating response...".dim());
        let result = controller.run_turn(&mut session, input).await;
        execute!(stderr, MoveToColumn(0), Clear(ClearType::CurrentLine))?;

        match result {
            Ok(report) => print_report(&report, &args),
            Err(e) => {
                error!("Turn failed: {}", e);
                println!(
                    "{}",
                    format!(
                        "❌ The assistant is unavailable right now ({}). Please contact support: {}",
                        e, SUPPORT_PHONE_NUMBER
                    )
                    .red()
                );
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}

fn print_banner() {
    println!("{}", "📈 Stock and Finance Chatbot".bold());
    println!(
        "Ask questions about stock prices, price histories, financial news, or exchange rates. \
         For support: {}",
        SUPPORT_PHONE_NUMBER.bold()
    );
    println!();
    println!("{}", "Example queries:".bold());
    println!("- What is the current price of Apple stock?");
    println!("- Show me the price history for Tesla.");
    println!("- What's new with SAP?");
    println!("- What is the exchange rate from EUR to USD?");
    println!();
    println!(
        "{}",
        "Commands: /history, /download [path], /quit".dim()
    );
    println!();
}

fn print_report(report: &TurnReport, args: &Args) {
    match &report.display {
        TurnDisplay::None => {}
        TurnDisplay::Chart { chart } => {
            match chart::render_chart(chart, args.chart_width, args.chart_height) {
                Ok(lines) => {
                    for line in lines {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    error!("Chart rendering failed: {}", e);
                    println!("{}", "Error while creating the chart.".red());
                }
            }
        }
        TurnDisplay::Warning { text } => println!("{}", text.as_str().yellow()),
        TurnDisplay::Error { text } => println!("{}", text.as_str().red()),
    }

    println!("{} {}", "🤖 Assistant:".bold(), report.answer.as_str().green());
    println!();
}

fn print_history(session: &Session) {
    for message in session.messages() {
        match message.role {
            Role::User => println!("{} {}", "🧑 You:".bold().blue(), message.content),
            Role::Assistant => {
                println!("{} {}", "🤖 Assistant:".bold().green(), message.content)
            }
            Role::System | Role::Tool => {}
        }
    }
    println!();
}

fn download(session: &Session, path: &str) {
    if !session.can_download() {
        println!("{}", "Nothing to download yet.".yellow());
        return;
    }

    let path = if path.is_empty() {
        PathBuf::from(TRANSCRIPT_FILE_NAME)
    } else {
        PathBuf::from(path)
    };

    match std::fs::write(&path, session.export_text()) {
        Ok(()) => println!("{}", format!("💾 Chat history saved to {}", path.display()).green()),
        Err(e) => {
            error!(path = %path.display(), "Failed to write chat history: {}", e);
            println!("{}", format!("❌ Could not save chat history: {}", e).red());
        }
    }
}
