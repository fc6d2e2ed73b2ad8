use areacrawl::{handle_crawl, handle_summary};
use areacrawl_core::config::DEFAULT_CONFIG_NAME;
use areacrawl_core::print_banner;
use areacrawl_core::report::ReportFormat;
use areacrawl_scanner::ROOT_PARENT_ID;
use commands::command_argument_builder;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let config_name = chosen_command
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_NAME);

    // A missing .env is fine; APPCODE may come from the real environment.
    dotenvy::dotenv().ok();

    if !quiet {
        print_banner();
    }

    match chosen_command.subcommand() {
        None => handle_crawl(config_name, ROOT_PARENT_ID, quiet).await,
        Some(("crawl", primary_command)) => {
            let root_id = primary_command
                .get_one::<String>("root")
                .map(String::as_str)
                .unwrap_or(ROOT_PARENT_ID);
            handle_crawl(config_name, root_id, quiet).await
        }
        Some(("summary", primary_command)) => {
            let run_id = primary_command.get_one::<String>("run").map(String::as_str);
            let format = primary_command
                .get_one::<String>("format")
                .and_then(|f| ReportFormat::from_str(f))
                .unwrap_or(ReportFormat::Text);
            handle_summary(config_name, run_id, format)
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
