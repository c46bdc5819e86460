use anyhow::Result;

use crate::link;

pub fn handle_commands(args: &[String]) -> Result<bool> {
    match args.get(1).map(|s| s.as_str()) {
        Some("link") => {
            link::run_from_args(args)?;
            Ok(true)
        }
        Some("help") | Some("--help") | Some("-h") => {
            println!("{}", link::config::USAGE);
            Ok(true)
        }
        _ => Ok(false),
    }
}
