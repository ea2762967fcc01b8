use clap::Parser;

/// This is an election scenario simulator: allocate votes region by region, then read the
/// national result, the swing regions and the regional breakdowns.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, share link or empty) A scenario to start from. It replaces the scenario
    /// saved in the --state file, if any.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default json) The type of the input: 'json' (scenario document), 'xlsx' (table of
    /// votes per region) or 'share' (share link or bare payload).
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// ('first' or 'second') Starts a new scenario for the given round. Without --candidate,
    /// the candidates of the current scenario are kept.
    #[clap(long, value_parser)]
    pub round: Option<String>,

    /// (repeatable) A candidate of a new scenario, as "Name:Party:#rrggbb". Party and color
    /// may be omitted.
    #[clap(long, value_parser)]
    pub candidate: Vec<String>,

    /// (repeatable) Adds a candidate to a first-round scenario, as "Name:Party:#rrggbb".
    #[clap(long, value_parser)]
    pub add_candidate: Vec<String>,

    /// (repeatable) Removes a candidate from a first-round scenario, by ordinal.
    #[clap(long, value_parser)]
    pub remove_candidate: Vec<u32>,

    /// (repeatable) Sets the votes of a region. "BR-SP=700,300" gives the votes of each
    /// candidate. "BR-SP=1000:70,30" gives a total and the percentage of each candidate.
    /// "BR-SP=:70,30" uses the current or default total of the region.
    #[clap(long, value_parser)]
    pub set: Vec<String>,

    /// (repeatable) Forgets the votes of a region.
    #[clap(long, value_parser)]
    pub clear_region: Vec<String>,

    /// (file path) Where the scenario is kept between runs. It is read if it exists, and
    /// written after every run that changed the scenario.
    #[clap(long, value_parser)]
    pub state: Option<String>,

    /// Discards the scenario kept in the --state file before doing anything else.
    #[clap(long, takes_value = false)]
    pub reset: bool,

    /// (file path, 'stdout' or empty) If specified, the summary of the analysis will be
    /// written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) Exports the scenario as a JSON document that can be read back with
    /// --input.
    #[clap(long, value_parser)]
    pub export: Option<String>,

    /// (base URL) Prints a share link of the scenario built on the given URL.
    #[clap(long, value_parser)]
    pub share_link: Option<String>,

    /// (file path) A reference file containing a summary in JSON format. If provided, elsim
    /// will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default 5) The number of regions in the rankings of the analysis.
    #[clap(long, value_parser)]
    pub top: Option<usize>,

    /// (file path) A JSON table of regions and groupings, replacing the built-in table of
    /// the Brazilian states.
    #[clap(long, value_parser)]
    pub regions: Option<String>,

    /// (repeatable) Prints the votes of a region, by decreasing number of votes.
    #[clap(long, value_parser)]
    pub show_region: Vec<String>,

    /// Does not print the text report.
    #[clap(long, takes_value = false)]
    pub quiet: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
