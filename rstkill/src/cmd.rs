use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rstkill",
    about = "Kill established TCP connections by injecting forged RST segments"
)]
pub struct Cmd {
    /// Set the log verbose.
    #[arg(
        short = 'v',
        default_value = "info",
        value_name = "verbose",
        value_parser = ["debug","info","warn","error"]
    )]
    pub verbose: String,

    /// Interface to listen on and inject into.
    #[arg(
        short = 'i',
        long = "interface",
        value_name = "iface",
        required_unless_present = "list"
    )]
    pub iface: Option<String>,

    /// Snapshot length of the capture.
    #[arg(short = 's', long, default_value_t = 65535)]
    pub snaplen: i32,

    /// Do not put the interface into promiscuous mode.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_promisc: bool,

    /// Stop after this many RST packets have been sent.
    #[arg(short = 'c', long, value_name = "N")]
    pub count: Option<u64>,

    /// Print the injection counters in prometheus text format on exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub metrics: bool,

    /// List the interfaces available for capture and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    pub list: bool,

    /// A tcpdump filter expression to select the connections to kill.
    #[arg(value_name = "FILTER", trailing_var_arg = true)]
    pub filter: Vec<String>,
}

impl Cmd {
    /// The operator filter, with multiple words joined the way tcpdump does.
    pub fn filter_expr(&self) -> Option<String> {
        if self.filter.is_empty() {
            None
        } else {
            Some(self.filter.join(" "))
        }
    }
}
