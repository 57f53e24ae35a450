use std::path::PathBuf;

/// Options shared by all applications.
///
/// `-r <src>` selects the source vertex (default 0), `-maxiters <N>` caps
/// the iteration count (default 100), `-e <events>` names the hardware
/// counter events, `-o` writes the per-vertex output file, `--new-ids`
/// points at the permutation produced by an external reordering pass. The
/// single free argument is the input graph path.
#[derive(Debug)]
pub struct AppOptions {
    pub input: PathBuf,
    pub source: usize,
    pub max_iters: usize,
    pub events: String,
    pub write_output: bool,
    pub new_ids: Option<PathBuf>,
}

impl AppOptions {
    pub fn from_args(args: &mut pico_args::Arguments) -> Result<Self, pico_args::Error> {
        Ok(Self {
            source: args.opt_value_from_str("-r")?.unwrap_or(0),
            max_iters: args.opt_value_from_str("-maxiters")?.unwrap_or(100),
            events: args
                .opt_value_from_str("-e")?
                .unwrap_or_else(|| "cycles:u".to_string()),
            write_output: args.contains("-o"),
            new_ids: args.opt_value_from_str("--new-ids")?,
            input: args.free_from_str()?,
        })
    }

    /// The input's file name, used for result-file naming.
    pub fn input_file_name(&self) -> String {
        self.input
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> AppOptions {
        let args = args.iter().map(|arg| (*arg).into()).collect();
        let mut args = pico_args::Arguments::from_vec(args);
        AppOptions::from_args(&mut args).unwrap()
    }

    #[test]
    fn defaults() {
        let options = parse(&["graph.adj"]);
        assert_eq!(options.source, 0);
        assert_eq!(options.max_iters, 100);
        assert_eq!(options.events, "cycles:u");
        assert!(!options.write_output);
        assert!(options.new_ids.is_none());
        assert_eq!(options.input_file_name(), "graph.adj");
    }

    #[test]
    fn explicit_values() {
        let options = parse(&[
            "-r",
            "17",
            "-maxiters",
            "5",
            "-e",
            "cycles:u,instructions:u",
            "-o",
            "data/road.adj",
        ]);
        assert_eq!(options.source, 17);
        assert_eq!(options.max_iters, 5);
        assert_eq!(options.events, "cycles:u,instructions:u");
        assert!(options.write_output);
        assert_eq!(options.input_file_name(), "road.adj");
    }
}
