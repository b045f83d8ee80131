//! config command - Print the effective configuration

use anyhow::Result;

use crate::cli::Context;
use crate::core::config::Config;
use crate::core::types::ObjectFormat;

/// Print every effective setting and where config was loaded from.
pub fn config(ctx: &Context) -> Result<()> {
    let session = super::open(ctx)?;
    print!("{}", render(&session.config, session.info.object_format));
    Ok(())
}

pub(crate) fn render(config: &Config, format: ObjectFormat) -> String {
    let source = |path: Option<&std::path::Path>| match path {
        Some(path) => path.display().to_string(),
        None => "(none)".to_string(),
    };
    let timeout = match config.command_timeout() {
        Some(timeout) => format!("{}s", timeout.as_secs()),
        None => "none".to_string(),
    };

    [
        format!("git_binary = {}", config.git_binary()),
        format!("command_timeout = {timeout}"),
        format!("log_limit = {}", config.log_limit()),
        format!("abbrev_len = {}", config.abbrev_len()),
        format!("show_untracked = {}", config.show_untracked()),
        format!("object_format = {format}"),
        format!("global config: {}", source(config.global_config_loaded_from())),
        format!("repo config: {}", source(config.repo_config_loaded_from())),
        String::new(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let text = render(&Config::default(), ObjectFormat::Sha1);
        assert_eq!(
            text,
            "git_binary = git\n\
             command_timeout = none\n\
             log_limit = 100\n\
             abbrev_len = 7\n\
             show_untracked = true\n\
             object_format = sha1\n\
             global config: (none)\n\
             repo config: (none)\n"
        );
    }
}
