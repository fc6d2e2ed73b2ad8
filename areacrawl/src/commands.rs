use crate::CLAP_STYLING;
use areacrawl_core::config::DEFAULT_CONFIG_NAME;
use areacrawl_scanner::ROOT_PARENT_ID;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("areacrawl")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("areacrawl")
        .styles(CLAP_STYLING)
        .about("Walks the administrative area API from the country level down and stores every area")
        .arg(arg!(-q --"quiet" "Suppress banner and the closing report").required(false))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Configuration file, with or without extension")
                .default_value(DEFAULT_CONFIG_NAME),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about("Crawl the area hierarchy into the configured database (the default)")
                .arg(
                    arg!(-r --"root" <ID>)
                        .required(false)
                        .help("Parent id to start from")
                        .default_value(ROOT_PARENT_ID),
                ),
        )
        .subcommand(
            command!("summary")
                .about("Print the report of a stored crawl run")
                .arg(
                    arg!(--"run" <RUN_ID>)
                        .required(false)
                        .help("Run to report on (default: the most recent run)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
