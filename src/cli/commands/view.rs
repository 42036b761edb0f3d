use clap::{Arg, ArgMatches, Command};

pub const ARG_TEMPLATE_ROOT: &str = "template-root";
pub const ARG_STATIC_ROOT: &str = "static-root";
pub const ARG_BASE_URI: &str = "base-uri";

#[derive(Debug, Clone)]
pub struct Options {
    pub template_root: String,
    pub static_root: String,
    pub base_uri: String,
}

impl Options {
    /// Parse view arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URI is not an absolute path.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get = |id: &str, default: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let base_uri = get(ARG_BASE_URI, "/");
        if !base_uri.starts_with('/') {
            anyhow::bail!("--{ARG_BASE_URI} must start with '/'");
        }

        Ok(Self {
            template_root: get(ARG_TEMPLATE_ROOT, "template"),
            static_root: get(ARG_STATIC_ROOT, "static"),
            base_uri,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TEMPLATE_ROOT)
                .long(ARG_TEMPLATE_ROOT)
                .help("Directory holding the page templates")
                .env("GATEHOUSE_TEMPLATE_ROOT")
                .default_value("template"),
        )
        .arg(
            Arg::new(ARG_STATIC_ROOT)
                .long(ARG_STATIC_ROOT)
                .help("Directory served under /static")
                .env("GATEHOUSE_STATIC_ROOT")
                .default_value("static"),
        )
        .arg(
            Arg::new(ARG_BASE_URI)
                .long(ARG_BASE_URI)
                .help("URI prefix used when rendering links, stylesheets and scripts")
                .env("GATEHOUSE_BASE_URI")
                .default_value("/"),
        )
}
