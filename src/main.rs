use log::{debug, info, warn};

use std::collections::HashSet;
use std::fs;

use clap::Parser;
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::{whatever, ResultExt};
use text_diff::print_diff;

use indicator_ranking::{run_ranking, RankingOptions, RankingTable};

mod args;
mod fetch;
mod ingest;
mod store;

use crate::args::Args;
use crate::ingest::mapping::{map_to_standard, ColumnMapping};
use crate::ingest::{
    io_json, io_jsonstat, DatasetCsvSnafu, DatasetIoSnafu, IngestResult, ParsingJsonSnafu,
    RawPayload, TidyTable,
};
use crate::store::{DatasetMeta, DatasetStore};

fn main() {
    let args = Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> IngestResult<()> {
    let store = DatasetStore::new(args.data_dir.as_str());
    if args.input.is_some() || args.url.is_some() {
        return run_import(args, &store);
    }
    if let Some(stat_url) = &args.stat_url {
        return run_stat_query(args, &store, stat_url);
    }
    if let Some(year) = &args.rank_year {
        return run_rank(args, &store, year);
    }
    if args.list {
        return run_list(args, &store);
    }
    whatever!("nothing to do: pass --input, --url, --stat-url, --list or --rank-year")
}

// ********* Import flows *********

fn run_import(args: &Args, store: &DatasetStore) -> IngestResult<()> {
    let retrieved_at = store::now_timestamp();
    let (payload, method) = match (&args.input, &args.url) {
        (Some(path), _) => (local_payload(path)?, "upload"),
        (None, Some(url)) => (fetch::fetch_url(url)?, "url-import"),
        (None, None) => whatever!("run_import called without a source"),
    };
    let table = ingest::resolve(&payload)?;
    info!(
        "run_import: resolved {} rows x {} columns",
        table.num_rows(),
        table.num_columns()
    );
    finish_import(args, store, table, method, retrieved_at, args.url.as_deref())
}

fn run_stat_query(args: &Args, store: &DatasetStore, stat_url: &str) -> IngestResult<()> {
    let query_path = match &args.stat_query {
        Some(path) => path,
        None => whatever!("--stat-query is required with --stat-url"),
    };
    let query_text = fs::read_to_string(query_path).context(DatasetIoSnafu { path: query_path })?;
    let query: JSValue = serde_json::from_str(&query_text).context(ParsingJsonSnafu {})?;

    let retrieved_at = store::now_timestamp();
    let payload = fetch::post_stat_query(stat_url, &query)?;
    let text = String::from_utf8_lossy(&payload.bytes).into_owned();
    let document: JSValue = serde_json::from_str(&text).context(ParsingJsonSnafu {})?;

    let table = match io_jsonstat::flatten(&document) {
        Ok(table) => table,
        Err(e) => {
            // Some endpoints answer plain tabular JSON to a stat query.
            warn!("run_stat_query: not a JSON-stat response ({}), trying generic shapes", e);
            match io_json::table_from_json(&document) {
                Some(table) => table,
                None => whatever!("the response is neither JSON-stat nor tabular JSON"),
            }
        }
    };
    info!(
        "run_stat_query: resolved {} rows x {} columns",
        table.num_rows(),
        table.num_columns()
    );
    finish_import(args, store, table, "stat-query", retrieved_at, Some(stat_url))
}

fn finish_import(
    args: &Args,
    store: &DatasetStore,
    table: TidyTable,
    method: &str,
    retrieved_at: String,
    source_url: Option<&str>,
) -> IngestResult<()> {
    let mapping = column_mapping(args);
    let to_save = if mapping.is_empty() {
        table
    } else {
        map_to_standard(&table, &mapping)
    };

    let title = args.title.clone().unwrap_or_else(|| "Dataset".to_string());
    let name = store::slugify(&title);
    let meta = DatasetMeta {
        name: String::new(),
        title,
        source: args.source.clone().unwrap_or_else(|| "unknown".to_string()),
        source_url: args
            .source_url
            .clone()
            .or_else(|| source_url.map(str::to_string))
            .unwrap_or_default(),
        method: method.to_string(),
        licence: args.licence.clone().unwrap_or_else(|| "Unknown".to_string()),
        tags: split_list(args.tags.as_deref()),
        description: args.description.clone().unwrap_or_default(),
        retrieved_at,
        rows: 0,
        saved_at: String::new(),
    };
    let entry = store.save(&name, &to_save, &meta)?;
    println!(
        "Saved dataset '{}' ({} rows) to {}",
        entry.meta.name,
        entry.meta.rows,
        entry.csv_path.display()
    );
    Ok(())
}

fn local_payload(path: &str) -> IngestResult<RawPayload> {
    let bytes = fs::read(path).context(DatasetIoSnafu { path })?;
    Ok(RawPayload {
        name: Some(path.to_string()),
        ..RawPayload::from_bytes(bytes)
    })
}

// ********* Listing *********

fn run_list(args: &Args, store: &DatasetStore) -> IngestResult<()> {
    let query = args.search.clone().unwrap_or_default();
    let wanted_tags = split_list(args.tag_filter.as_deref());
    for entry in store.list()? {
        if !entry.matches_search(&query) || !entry.has_tags(&wanted_tags) {
            continue;
        }
        println!(
            "{}  {} rows  [{}]  {}",
            entry.meta.name,
            entry.meta.rows,
            entry.meta.tags.join(", "),
            entry.meta.title
        );
    }
    Ok(())
}

// ********* Ranking *********

fn run_rank(args: &Args, store: &DatasetStore, year: &str) -> IngestResult<()> {
    let indicators = split_list(args.rank_indicators.as_deref());
    if indicators.is_empty() {
        whatever!("--rank-indicators is required with --rank-year");
    }
    let positive: HashSet<String> = match args.rank_positive.as_deref() {
        Some(raw) => split_list(Some(raw)).into_iter().collect(),
        // Without an explicit split, every indicator counts as favorable.
        None => indicators.iter().cloned().collect(),
    };
    let options = RankingOptions {
        year: year.to_string(),
        indicators,
        positive,
        negative_weight: args.negative_weight,
    };

    let mut records = Vec::new();
    for entry in store.list()? {
        let table = store.read_table(&entry.meta.name)?;
        match store::standard_records(&table) {
            Some(mut rs) => records.append(&mut rs),
            None => debug!("run_rank: {} is not standard-shaped, skipped", entry.meta.name),
        }
    }
    info!("run_rank: {} standard records collected", records.len());

    let result = match run_ranking(&records, &options) {
        Ok(table) => table,
        Err(e) => whatever!("ranking error: {}", e),
    };

    let summary = ranking_summary(&options, &result);
    let pretty = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
    println!("{}", pretty);

    if let Some(out) = &args.out {
        write_ranking_csv(out, &result)?;
        info!("run_rank: wrote {}", out);
    }

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        let reference_text = fs::read_to_string(reference_path).context(DatasetIoSnafu {
            path: reference_path,
        })?;
        let reference: JSValue =
            serde_json::from_str(&reference_text).context(ParsingJsonSnafu {})?;
        let pretty_reference = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_reference != pretty {
            warn!("Found differences with the reference summary");
            print_diff(pretty_reference.as_str(), pretty.as_str(), "\n");
            whatever!("Difference detected between computed ranking and reference summary");
        }
    }
    Ok(())
}

fn ranking_summary(options: &RankingOptions, table: &RankingTable) -> JSValue {
    let results: Vec<JSValue> = table
        .rows
        .iter()
        .map(|row| {
            let mut obj = serde_json::Map::new();
            obj.insert("region".to_string(), json!(row.region));
            for (indicator, mean) in table.indicators.iter().zip(&row.means) {
                let cell = match mean {
                    Some(v) => json!(v),
                    None => JSValue::Null,
                };
                obj.insert(indicator.clone(), cell);
            }
            obj.insert("score".to_string(), json!(row.score));
            JSValue::Object(obj)
        })
        .collect();
    json!({
        "year": options.year,
        "indicators": options.indicators,
        "negativeWeight": options.negative_weight,
        "results": results,
    })
}

fn write_ranking_csv(path: &str, table: &RankingTable) -> IngestResult<()> {
    let mut writer = csv::Writer::from_path(path).context(DatasetCsvSnafu { path })?;
    let mut header = vec!["region".to_string()];
    header.extend(table.indicators.iter().cloned());
    header.push("score".to_string());
    writer.write_record(&header).context(DatasetCsvSnafu { path })?;
    for row in &table.rows {
        let mut record = vec![row.region.clone()];
        record.extend(
            row.means
                .iter()
                .map(|m| m.map(|v| v.to_string()).unwrap_or_default()),
        );
        record.push(row.score.to_string());
        writer.write_record(&record).context(DatasetCsvSnafu { path })?;
    }
    writer.flush().context(DatasetIoSnafu { path })?;
    Ok(())
}

// ********* Small helpers *********

fn split_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(s) => s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

fn column_mapping(args: &Args) -> ColumnMapping {
    ColumnMapping {
        region: args.map_region.clone(),
        year: args.map_year.clone(),
        indicator: args.map_indicator.clone(),
        value: args.map_value.clone(),
        unit: args.map_unit.clone(),
        source: args.map_source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_empties() {
        assert_eq!(split_list(Some("a, b ,,c")), vec!["a", "b", "c"]);
        assert_eq!(split_list(Some("")), Vec::<String>::new());
        assert_eq!(split_list(None), Vec::<String>::new());
    }

    #[test]
    fn ranking_summary_keeps_indicator_columns() {
        let options = RankingOptions {
            year: "2023".to_string(),
            indicators: vec!["income".to_string()],
            positive: ["income".to_string()].into_iter().collect(),
            negative_weight: 0.5,
        };
        let table = RankingTable {
            indicators: options.indicators.clone(),
            rows: vec![indicator_ranking::RegionScore {
                region: "Oslo".to_string(),
                means: vec![None],
                score: 0.0,
            }],
        };
        let summary = ranking_summary(&options, &table);
        assert_eq!(summary["results"][0]["region"], "Oslo");
        assert!(summary["results"][0]["income"].is_null());
        assert_eq!(summary["results"][0]["score"], 0.0);
        assert_eq!(summary["negativeWeight"], 0.5);
    }
}
