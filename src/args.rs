use clap::Parser;

/// Imports tabular datasets, standardizes them and ranks regions across
/// indicators.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) A local CSV, Excel (.xlsx) or JSON file to import as a dataset.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (URL) A remote resource to import. The declared content type is used as a
    /// parsing hint; the payload is sniffed when the declaration is wrong.
    #[clap(short, long, value_parser)]
    pub url: Option<String>,

    /// (URL) A statistics-agency endpoint accepting a JSON-stat POST query.
    #[clap(long, value_parser)]
    pub stat_url: Option<String>,

    /// (file path) The JSON query payload to POST to --stat-url.
    #[clap(long, value_parser)]
    pub stat_query: Option<String>,

    /// Title of the imported dataset, also the basis for its storage name.
    #[clap(short, long, value_parser)]
    pub title: Option<String>,

    /// Name of the publisher of the imported data.
    #[clap(long, value_parser)]
    pub source: Option<String>,

    /// URL the data was originally retrieved from, when different from --url.
    #[clap(long, value_parser)]
    pub source_url: Option<String>,

    /// Licence of the imported data.
    #[clap(long, value_parser)]
    pub licence: Option<String>,

    /// (list of comma-separated values) Tags attached to the imported dataset.
    #[clap(long, value_parser)]
    pub tags: Option<String>,

    /// Free-form description of the imported dataset.
    #[clap(long, value_parser)]
    pub description: Option<String>,

    /// Source column holding the region name. Passing any --map-* option maps
    /// the imported table onto the standard fields (region, year, indicator,
    /// value, unit, source); fields without a mapping come out empty.
    #[clap(long, value_parser)]
    pub map_region: Option<String>,

    /// Source column holding the year.
    #[clap(long, value_parser)]
    pub map_year: Option<String>,

    /// Source column holding the indicator name.
    #[clap(long, value_parser)]
    pub map_indicator: Option<String>,

    /// Source column holding the value.
    #[clap(long, value_parser)]
    pub map_value: Option<String>,

    /// Source column holding the unit.
    #[clap(long, value_parser)]
    pub map_unit: Option<String>,

    /// Source column holding the source name.
    #[clap(long, value_parser)]
    pub map_source: Option<String>,

    /// (directory) Where datasets are stored.
    #[clap(long, value_parser, default_value = "data")]
    pub data_dir: String,

    /// List the stored datasets.
    #[clap(short, long, takes_value = false)]
    pub list: bool,

    /// Only list datasets whose title, source or tags contain this text.
    #[clap(long, value_parser)]
    pub search: Option<String>,

    /// (list of comma-separated values) Only list datasets carrying all of
    /// these tags.
    #[clap(long, value_parser)]
    pub tag_filter: Option<String>,

    /// Rank regions for this year across the stored standard datasets.
    #[clap(long, value_parser)]
    pub rank_year: Option<String>,

    /// (list of comma-separated values) Indicators to rank on.
    #[clap(long, value_parser)]
    pub rank_indicators: Option<String>,

    /// (list of comma-separated values) Indicators where a high value is
    /// favorable. Defaults to every requested indicator.
    #[clap(long, value_parser)]
    pub rank_positive: Option<String>,

    /// Weight in [0, 1] given to the indicators where a low value is favorable.
    #[clap(long, value_parser, default_value_t = 0.5)]
    pub negative_weight: f64,

    /// (file path) Write the ranking table as CSV to this location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference ranking summary in JSON format. If provided,
    /// the computed summary is checked against it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
