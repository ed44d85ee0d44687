use crate::CLAP_STYLING;
use clap::{arg, command};

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("blogmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("blogmap")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("discover")
                .about(
                    "Crawl outward from seed blogs, following who cites whom, until the \
                target count is reached or the frontier runs dry.",
                )
                .arg(
                    arg!(-s --"seeds" <PATH>)
                        .required(false)
                        .help("Newline-delimited file of seed blog URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .default_value("seeds.txt"),
                )
                .arg(
                    arg!(-n --"max-blogs" <COUNT>)
                        .required(false)
                        .help("Stop once this many blogs have been accepted")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("250"),
                )
                .arg(
                    arg!(--"strategy" <STRATEGY>)
                        .required(false)
                        .help("Queue exploration order")
                        .value_parser(["breadth-first", "depth-first", "random", "mixed"])
                        .default_value("breadth-first"),
                )
                .arg(
                    arg!(--"checkpoint" <PATH>)
                        .required(false)
                        .help("Resume from this exact checkpoint file")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with_all(["resume-near", "fresh"]),
                )
                .arg(
                    arg!(--"resume-near" <COUNT>)
                        .required(false)
                        .help(
                            "Resume from the stored checkpoint whose accepted count is \
                        closest to COUNT",
                        )
                        .value_parser(clap::value_parser!(u64))
                        .conflicts_with_all(["checkpoint", "fresh"]),
                )
                .arg(
                    arg!(--"fresh")
                        .required(false)
                        .help("Archive any existing checkpoint and results, then start over")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"requeue-errors")
                        .required(false)
                        .help("On resume, retry domains that previously failed with errors")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(-d --"data-dir" <DIR>)
                        .required(false)
                        .help("Directory for checkpoints and results")
                        .default_value("data"),
                ),
        )
        .subcommand(
            command!("export")
                .about("Write the accepted-blog report from the current checkpoint")
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Where to write the JSON report")
                        .default_value("data/results.json"),
                )
                .arg(
                    arg!(-d --"data-dir" <DIR>)
                        .required(false)
                        .help("Directory holding the checkpoint to export from")
                        .default_value("data"),
                ),
        )
}
