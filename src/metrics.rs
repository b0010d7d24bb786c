//! Derived metrics over the city dataset.
//!
//! Every function here is pure: it takes the current records plus any
//! filter or year state explicitly and returns freshly built values.

use crate::models::{
    CityFilter, CityRecord, DashboardFilters, DashboardResponse, DashboardSummary,
    DerivedCityMetric, ElectorateBucket, ElectorateDistribution, Field, FieldTotal, GrowthBar,
    GrowthCounts, Order, PerformanceSummary, ShareSlice, VotesChart, VotesSeries, Year,
    YearSelection,
};
use std::cmp::Ordering;

pub const VOTES_CHART_CITIES: usize = 15;
pub const GROWTH_CHART_BARS: usize = 20;
pub const GROWTH_LABEL_CHARS: usize = 14;
pub const ELECTORATE_LEADERS: usize = 5;
pub const PERFORMANCE_LEADERS: usize = 5;
pub const TARGET_LEADERS: usize = 10;

impl Field {
    pub fn value(self, record: &CityRecord) -> Option<u64> {
        match self {
            Field::Electorate => Some(record.electorate_size),
            Field::Votes2018 => record.votes_2018,
            Field::Votes2022 => record.votes_2022,
            Field::TargetMax2026 => record.target_max_2026,
            Field::TargetMid2026 => record.target_mid_2026,
            Field::TargetMin2026 => record.target_min_2026,
            Field::EffectiveTarget2026 => effective_target_2026(record),
        }
    }
}

pub fn filter_by_name<'a>(records: &'a [CityRecord], query: &str) -> Vec<&'a CityRecord> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|record| matches_name(record, &needle))
        .collect()
}

pub fn filter_by_electorate_bucket(
    records: &[CityRecord],
    bucket: ElectorateBucket,
) -> Vec<&CityRecord> {
    records
        .iter()
        .filter(|record| bucket.contains(record.electorate_size))
        .collect()
}

pub fn filter_cities<'a>(records: &'a [CityRecord], filter: &CityFilter) -> Vec<&'a CityRecord> {
    let needle = filter.query.to_lowercase();
    records
        .iter()
        .filter(|record| {
            matches_name(record, &needle) && filter.bucket.contains(record.electorate_size)
        })
        .collect()
}

fn matches_name(record: &CityRecord, lowered_query: &str) -> bool {
    lowered_query.is_empty() || record.name.to_lowercase().contains(lowered_query)
}

pub fn sum_field<'a>(records: impl IntoIterator<Item = &'a CityRecord>, field: Field) -> u64 {
    field_total(records, field).sum
}

pub fn field_total<'a>(
    records: impl IntoIterator<Item = &'a CityRecord>,
    field: Field,
) -> FieldTotal {
    records
        .into_iter()
        .filter_map(|record| field.value(record))
        .fold(FieldTotal::default(), |total, value| FieldTotal {
            sum: total.sum.saturating_add(value),
            defined: total.defined + 1,
        })
}

/// Projection used for ranking and totals: max, then mid, then min.
pub fn effective_target_2026(record: &CityRecord) -> Option<u64> {
    record
        .target_max_2026
        .or(record.target_mid_2026)
        .or(record.target_min_2026)
}

/// Percentage change 2018 → 2022. `None` unless both are present and 2018 is positive.
pub fn growth_pct(record: &CityRecord) -> Option<f64> {
    match (record.votes_2018, record.votes_2022) {
        (Some(base), Some(current)) if base > 0 => {
            Some((current as f64 - base as f64) / base as f64 * 100.0)
        }
        _ => None,
    }
}

pub fn total_growth_pct<'a>(
    records: impl IntoIterator<Item = &'a CityRecord> + Clone,
    from: Field,
    to: Field,
) -> f64 {
    let base = sum_field(records.clone(), from);
    if base == 0 {
        return 0.0;
    }
    let target = sum_field(records, to);
    (target as f64 - base as f64) / base as f64 * 100.0
}

pub fn derive_city(record: &CityRecord) -> DerivedCityMetric {
    DerivedCityMetric {
        record: record.clone(),
        growth_pct: growth_pct(record),
        effective_target_2026: effective_target_2026(record),
    }
}

pub fn derive_cities<'a>(
    records: impl IntoIterator<Item = &'a CityRecord>,
) -> Vec<DerivedCityMetric> {
    records.into_iter().map(derive_city).collect()
}

fn eligible_growth<'a>(
    records: impl IntoIterator<Item = &'a CityRecord>,
) -> Vec<(&'a CityRecord, f64)> {
    records
        .into_iter()
        .filter_map(|record| growth_pct(record).map(|growth| (record, growth)))
        .collect()
}

/// Eligible records ranked by growth. `Vec::sort_by` is stable, so ties keep input order.
pub fn top_by_growth<'a>(
    records: impl IntoIterator<Item = &'a CityRecord>,
    n: usize,
    order: Order,
) -> Vec<DerivedCityMetric> {
    let mut ranked = eligible_growth(records);
    ranked.sort_by(|(_, a), (_, b)| match order {
        Order::Descending => b.total_cmp(a),
        Order::Ascending => a.total_cmp(b),
    });
    ranked
        .into_iter()
        .take(n)
        .map(|(record, _)| derive_city(record))
        .collect()
}

pub fn top_by_electorate<'a>(
    records: impl IntoIterator<Item = &'a CityRecord>,
    n: usize,
) -> ElectorateDistribution {
    let mut ranked: Vec<&CityRecord> = records.into_iter().collect();
    ranked.sort_by(|a, b| b.electorate_size.cmp(&a.electorate_size));

    let others = sum_field(ranked.iter().skip(n).copied(), Field::Electorate);
    let leaders = ranked
        .into_iter()
        .take(n)
        .map(|record| ShareSlice {
            id: record.id,
            name: record.name.clone(),
            value: record.electorate_size,
        })
        .collect();

    ElectorateDistribution { leaders, others }
}

/// Records without any projection rank after every record that has one.
pub fn top_by_effective_target<'a>(
    records: impl IntoIterator<Item = &'a CityRecord>,
    n: usize,
) -> Vec<DerivedCityMetric> {
    let mut ranked: Vec<DerivedCityMetric> = derive_cities(records);
    ranked.sort_by(|a, b| b.effective_target_2026.cmp(&a.effective_target_2026));
    ranked.truncate(n);
    ranked
}

pub fn growth_counts<'a>(records: impl IntoIterator<Item = &'a CityRecord>) -> GrowthCounts {
    eligible_growth(records)
        .into_iter()
        .fold(GrowthCounts::default(), |mut counts, (_, growth)| {
            match growth.partial_cmp(&0.0) {
                Some(Ordering::Greater) => counts.growing += 1,
                Some(Ordering::Less) => counts.declining += 1,
                _ => counts.stable += 1,
            }
            counts
        })
}

/// First records in input order, one series per active year.
pub fn votes_series(records: &[&CityRecord], years: &YearSelection) -> VotesChart {
    let shown = &records[..records.len().min(VOTES_CHART_CITIES)];
    let categories = shown.iter().map(|record| record.name.clone()).collect();
    let series = years
        .iter()
        .map(|year| {
            let (label, field) = series_field(year);
            VotesSeries {
                year,
                label,
                values: shown.iter().map(|record| field.value(record)).collect(),
            }
        })
        .collect();

    VotesChart { categories, series }
}

fn series_field(year: Year) -> (&'static str, Field) {
    match year {
        Year::Y2018 => ("Votos 2018", Field::Votes2018),
        Year::Y2022 => ("Votos 2022", Field::Votes2022),
        Year::Y2026 => ("Meta 2026", Field::EffectiveTarget2026),
    }
}

pub fn growth_bars<'a>(records: impl IntoIterator<Item = &'a CityRecord>) -> Vec<GrowthBar> {
    let mut bars: Vec<GrowthBar> = eligible_growth(records)
        .into_iter()
        .map(|(record, growth)| GrowthBar {
            name: display_name(&record.name, GROWTH_LABEL_CHARS),
            growth: round_to_tenth(growth),
        })
        .collect();
    bars.sort_by(|a, b| b.growth.total_cmp(&a.growth));
    bars.truncate(GROWTH_CHART_BARS);
    bars
}

pub fn display_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let mut truncated: String = name.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

/// Rounds through the one-decimal text form, so halves follow the exact binary value
/// (1.15 is stored just below 1.15 and becomes 1.1).
fn round_to_tenth(value: f64) -> f64 {
    format!("{value:.1}").parse().unwrap_or(value)
}

pub fn summarize(records: &[CityRecord]) -> DashboardSummary {
    DashboardSummary {
        city_count: records.len(),
        total_electorate: sum_field(records, Field::Electorate),
        votes_2018: field_total(records, Field::Votes2018),
        votes_2022: field_total(records, Field::Votes2022),
        target_2026: field_total(records, Field::EffectiveTarget2026),
        target_min_2026: field_total(records, Field::TargetMin2026),
        growth_2018_2022: total_growth_pct(records, Field::Votes2018, Field::Votes2022),
        growth_2022_2026: total_growth_pct(records, Field::Votes2022, Field::EffectiveTarget2026),
    }
}

/// Growth comparison only makes sense while both 2018 and 2022 are active.
pub fn performance(records: &[&CityRecord], years: &YearSelection, n: usize) -> PerformanceSummary {
    if !years.contains(Year::Y2018) || !years.contains(Year::Y2022) {
        return PerformanceSummary {
            comparison_available: false,
            counts: GrowthCounts::default(),
            top_growth: Vec::new(),
            top_decline: Vec::new(),
        };
    }

    PerformanceSummary {
        comparison_available: true,
        counts: growth_counts(records.iter().copied()),
        top_growth: top_by_growth(records.iter().copied(), n, Order::Descending),
        top_decline: top_by_growth(records.iter().copied(), n, Order::Ascending),
    }
}

/// Rows shown for the current filters. An empty year selection shows nothing.
pub fn visible_cities<'a>(
    records: &'a [CityRecord],
    filters: &DashboardFilters,
) -> Vec<&'a CityRecord> {
    if filters.years.is_empty() {
        return Vec::new();
    }
    filter_cities(records, &filters.city)
}

pub fn build_dashboard(
    records: &[CityRecord],
    filters: &DashboardFilters,
    loaded_at: &str,
) -> DashboardResponse {
    let rows = visible_cities(records, filters);
    let rows = rows.as_slice();
    let years = &filters.years;

    DashboardResponse {
        years: years.clone(),
        bucket: filters.city.bucket,
        query: filters.city.query.clone(),
        loaded_at: loaded_at.to_string(),
        summary: summarize(records),
        filtered_count: rows.len(),
        cities: derive_cities(rows.iter().copied()),
        votes_chart: votes_series(rows, years),
        electorate_chart: top_by_electorate(rows.iter().copied(), ELECTORATE_LEADERS),
        growth_chart: growth_bars(rows.iter().copied()),
        performance: performance(rows, years, PERFORMANCE_LEADERS),
        target_leaders: if years.contains(Year::Y2026) {
            top_by_effective_target(rows.iter().copied(), TARGET_LEADERS)
        } else {
            Vec::new()
        },
    }
}
