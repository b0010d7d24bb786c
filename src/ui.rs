use crate::models::{
    DashboardResponse, DerivedCityMetric, ElectorateBucket, ElectorateDistribution, GrowthBar,
    PerformanceSummary, VotesChart, Year, YearSelection,
};
use reqwest::Url;
use std::fmt::Write;

const PALETTE: [&str; 6] = [
    "hsl(45 93% 58%)",
    "hsl(210 70% 45%)",
    "hsl(160 60% 45%)",
    "hsl(340 65% 55%)",
    "hsl(270 60% 55%)",
    "hsl(215 20% 40%)",
];

pub fn render_dashboard(dashboard: &DashboardResponse) -> String {
    let summary = &dashboard.summary;
    INDEX_HTML
        .replace("{{CITY_COUNT}}", &summary.city_count.to_string())
        .replace("{{LOADED_AT}}", &escape_html(&dashboard.loaded_at))
        .replace("{{KPIS}}", &render_kpis(dashboard))
        .replace("{{FILTERS}}", &render_filters(dashboard))
        .replace("{{PERFORMANCE}}", &render_performance(&dashboard.performance))
        .replace("{{VOTES_CHART}}", &render_votes_chart(&dashboard.votes_chart))
        .replace(
            "{{ELECTORATE_CHART}}",
            &render_electorate_chart(&dashboard.electorate_chart),
        )
        .replace("{{GROWTH_CHART}}", &render_growth_chart(&dashboard.growth_chart))
        .replace("{{TARGETS}}", &render_targets(dashboard))
        .replace("{{TABLE}}", &render_table(&dashboard.cities, &dashboard.years))
}

pub fn render_unavailable() -> String {
    UNAVAILABLE_HTML.to_string()
}

fn render_kpis(dashboard: &DashboardResponse) -> String {
    let summary = &dashboard.summary;
    let mut out = String::new();
    out.push_str(&kpi_card(
        "Total de Eleitores",
        &format_count(summary.total_electorate),
        Some(&format!("{} cidades", summary.city_count)),
        None,
    ));
    out.push_str(&kpi_card(
        "Votos 2022",
        &format_total(summary.votes_2022.sum, summary.votes_2022.defined),
        None,
        Some((summary.growth_2018_2022, "vs 2018")),
    ));
    out.push_str(&kpi_card(
        "Meta Alvo 2026",
        &format_total(summary.target_2026.sum, summary.target_2026.defined),
        None,
        Some((summary.growth_2022_2026, "vs 2022")),
    ));
    out.push_str(&kpi_card(
        "Meta Mínima 2026",
        &format_total(summary.target_min_2026.sum, summary.target_min_2026.defined),
        Some("Cenário conservador"),
        None,
    ));
    out
}

fn kpi_card(title: &str, value: &str, subtitle: Option<&str>, trend: Option<(f64, &str)>) -> String {
    let mut card = format!(
        r#"<div class="card kpi"><p class="label">{}</p><p class="value">{}</p>"#,
        escape_html(title),
        value
    );
    if let Some(subtitle) = subtitle {
        let _ = write!(card, r#"<p class="muted">{}</p>"#, escape_html(subtitle));
    }
    if let Some((pct, against)) = trend {
        let (class, arrow) = trend_marker(pct);
        let _ = write!(
            card,
            r#"<p class="trend {class}">{arrow} {}% {against}</p>"#,
            format_decimal(pct.abs(), 1)
        );
    }
    card.push_str("</div>");
    card
}

fn trend_marker(pct: f64) -> (&'static str, &'static str) {
    if pct > 0.0 {
        ("up", "↑")
    } else if pct < 0.0 {
        ("down", "↓")
    } else {
        ("neutral", "→")
    }
}

fn render_filters(dashboard: &DashboardResponse) -> String {
    let years = &dashboard.years;
    let mut out = String::from(r#"<form class="filters" method="get" action="/">"#);
    let _ = write!(
        out,
        r#"<input type="search" name="q" placeholder="Buscar cidade..." value="{}" />"#,
        escape_html(&dashboard.query)
    );
    out.push_str(r#"<select name="bucket">"#);
    for bucket in ElectorateBucket::ALL {
        let selected = if bucket == dashboard.bucket { " selected" } else { "" };
        let _ = write!(
            out,
            r#"<option value="{}"{selected}>{}</option>"#,
            bucket.as_str(),
            escape_html(bucket.label())
        );
    }
    out.push_str("</select>");
    let _ = write!(
        out,
        r#"<input type="hidden" name="years" value="{}" />"#,
        years.to_query_value()
    );
    out.push_str(r#"<button type="submit">Filtrar</button>"#);
    let plural = if dashboard.filtered_count == 1 { "" } else { "s" };
    let _ = write!(
        out,
        r#"<span class="muted">{} cidade{plural}</span></form>"#,
        dashboard.filtered_count
    );

    out.push_str(r#"<nav class="years">"#);
    for year in Year::ALL {
        let active = years.contains(year);
        let class = if active { "chip active" } else { "chip" };
        match years.toggled(year) {
            Some(next) => {
                let href = dashboard_href(&dashboard.query, dashboard.bucket, &next);
                let _ = write!(out, r#"<a class="{class}" href="{href}">{year}</a>"#);
            }
            // The last active year cannot be switched off.
            None => {
                let _ = write!(out, r#"<span class="{class} locked">{year}</span>"#);
            }
        }
    }
    out.push_str("</nav>");
    out
}

fn render_performance(performance: &PerformanceSummary) -> String {
    if !performance.comparison_available {
        let hint = r#"<p class="muted">Ative 2018 e 2022 para ver a comparação de performance.</p>"#;
        return format!(
            r#"<div class="card"><h3>Resumo de Performance</h3>{hint}</div>
<div class="card"><h3 class="up">Maior Crescimento</h3>{hint}</div>
<div class="card"><h3 class="down">Maior Queda</h3>{hint}</div>"#
        );
    }

    let counts = performance.counts;
    let mut out = format!(
        r#"<div class="card"><h3>Resumo de Performance</h3><ul class="rows">
<li><span>Em crescimento</span><strong class="up">{}</strong></li>
<li><span>Em queda</span><strong class="down">{}</strong></li>
<li><span>Estável</span><strong class="neutral">{}</strong></li></ul></div>"#,
        counts.growing, counts.declining, counts.stable
    );
    out.push_str(&growth_list("Maior Crescimento", "up", &performance.top_growth));
    out.push_str(&growth_list("Maior Queda", "down", &performance.top_decline));
    out
}

fn growth_list(title: &str, class: &str, cities: &[DerivedCityMetric]) -> String {
    let mut out = format!(r#"<div class="card"><h3 class="{class}">{title}</h3><ul class="rows">"#);
    for city in cities {
        let growth = city.growth_pct.unwrap_or_default();
        let (class, _) = trend_marker(growth);
        let sign = if growth > 0.0 { "+" } else { "" };
        let _ = write!(
            out,
            r#"<li><span>{}</span><strong class="{class}">{sign}{}%</strong></li>"#,
            escape_html(&city.record.name),
            format_decimal(growth, 0)
        );
    }
    out.push_str("</ul></div>");
    out
}

fn render_votes_chart(chart: &VotesChart) -> String {
    if chart.series.is_empty() || chart.categories.is_empty() {
        return r#"<p class="muted">Sem dados para exibir.</p>"#.to_string();
    }

    let max = chart
        .series
        .iter()
        .flat_map(|series| series.values.iter().flatten())
        .copied()
        .max()
        .unwrap_or(0)
        .max(1);

    let mut out = String::from(r#"<div class="legend">"#);
    for series in &chart.series {
        let _ = write!(
            out,
            r#"<span><i style="background:{}"></i>{}</span>"#,
            series_color(series.year),
            series.label
        );
    }
    out.push_str("</div>");

    for (index, name) in chart.categories.iter().enumerate() {
        let _ = write!(
            out,
            r#"<div class="bar-row"><span class="bar-label">{}</span><div class="bar-stack">"#,
            escape_html(name)
        );
        for series in &chart.series {
            let value = series.values.get(index).copied().flatten();
            let width = value.map_or(0.0, |value| value as f64 * 100.0 / max as f64);
            let _ = write!(
                out,
                r#"<div class="bar" style="width:{width:.1}%;background:{}" title="{}: {}"></div>"#,
                series_color(series.year),
                series.label,
                format_optional(value)
            );
        }
        out.push_str("</div></div>");
    }
    out
}

fn series_color(year: Year) -> &'static str {
    match year {
        Year::Y2018 => PALETTE[1],
        Year::Y2022 => PALETTE[2],
        Year::Y2026 => PALETTE[0],
    }
}

fn render_electorate_chart(distribution: &ElectorateDistribution) -> String {
    let total: u64 = distribution
        .leaders
        .iter()
        .map(|slice| slice.value)
        .sum::<u64>()
        + distribution.others;
    if total == 0 {
        return r#"<p class="muted">Sem dados para exibir.</p>"#.to_string();
    }

    let slices = distribution
        .leaders
        .iter()
        .map(|slice| (slice.name.as_str(), slice.value))
        .chain(std::iter::once(("Outras", distribution.others)));

    let mut stops = Vec::new();
    let mut legend = String::new();
    let mut start = 0.0;
    for (index, (name, value)) in slices.enumerate() {
        let color = PALETTE[index % PALETTE.len()];
        let share = value as f64 * 100.0 / total as f64;
        let end = start + share;
        stops.push(format!("{color} {start:.2}% {end:.2}%"));
        let _ = write!(
            legend,
            r#"<li><i style="background:{color}"></i><span>{}</span><strong>{}</strong></li>"#,
            escape_html(name),
            format_count(value)
        );
        start = end;
    }

    format!(
        r#"<div class="donut" style="background:conic-gradient({})"></div><ul class="rows legend-list">{legend}</ul>"#,
        stops.join(", ")
    )
}

fn render_growth_chart(bars: &[GrowthBar]) -> String {
    if bars.is_empty() {
        return r#"<p class="muted">Sem dados para exibir.</p>"#.to_string();
    }

    let max = bars
        .iter()
        .map(|bar| bar.growth.abs())
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let mut out = String::new();
    for bar in bars {
        let class = if bar.growth >= 0.0 { "up" } else { "down" };
        let width = bar.growth.abs() * 50.0 / max;
        let _ = write!(
            out,
            r#"<div class="bar-row"><span class="bar-label">{}</span><div class="growth-track"><div class="growth {class}" style="width:{width:.1}%"></div></div><span class="bar-value">{}%</span></div>"#,
            escape_html(&bar.name),
            format_decimal(bar.growth, 1)
        );
    }
    out
}

fn render_targets(dashboard: &DashboardResponse) -> String {
    if !dashboard.years.contains(Year::Y2026) {
        return r#"<p class="muted">Ative 2026 para ver as metas.</p>"#.to_string();
    }
    let mut out = String::from(r#"<ol class="rows">"#);
    for city in &dashboard.target_leaders {
        let _ = write!(
            out,
            r#"<li><span>{}</span><strong>{}</strong></li>"#,
            escape_html(&city.record.name),
            format_optional(city.effective_target_2026)
        );
    }
    out.push_str("</ol>");
    out
}

fn render_table(cities: &[DerivedCityMetric], years: &YearSelection) -> String {
    let show_2018 = years.contains(Year::Y2018);
    let show_2022 = years.contains(Year::Y2022);
    let show_2026 = years.contains(Year::Y2026);

    let mut out = String::from("<table><thead><tr><th>#</th><th>Cidade</th><th>Eleitores</th>");
    if show_2018 {
        out.push_str("<th>2018</th>");
    }
    if show_2022 {
        out.push_str("<th>2022</th>");
    }
    if show_2018 && show_2022 {
        out.push_str("<th>Cresc.</th>");
    }
    if show_2026 {
        out.push_str(r#"<th class="target">Meta Max</th><th class="target">Meta Méd</th><th class="target">Meta Mín</th>"#);
    }
    out.push_str("</tr></thead><tbody>");

    for city in cities {
        let record = &city.record;
        let _ = write!(
            out,
            "<tr><td>{}</td><td>{}</td><td>{}</td>",
            record.id,
            escape_html(&record.name),
            format_count(record.electorate_size)
        );
        if show_2018 {
            let _ = write!(out, "<td>{}</td>", format_optional(record.votes_2018));
        }
        if show_2022 {
            let _ = write!(out, "<td>{}</td>", format_optional(record.votes_2022));
        }
        if show_2018 && show_2022 {
            let growth = city
                .growth_pct
                .map_or_else(|| "—".to_string(), |growth| format!("{}%", format_decimal(growth, 1)));
            let _ = write!(out, "<td>{growth}</td>");
        }
        if show_2026 {
            let _ = write!(
                out,
                r#"<td class="target">{}</td><td class="target">{}</td><td class="target">{}</td>"#,
                format_optional(record.target_max_2026),
                format_optional(record.target_mid_2026),
                format_optional(record.target_min_2026)
            );
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// Link back to the dashboard with the given filters, escaped for an HTML attribute.
fn dashboard_href(query: &str, bucket: ElectorateBucket, years: &YearSelection) -> String {
    let Ok(mut url) = Url::parse("http://dashboard.local/") else {
        return "/".to_string();
    };
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("bucket", bucket.as_str())
        .append_pair("years", &years.to_query_value());
    format!("/?{}", escape_html(url.query().unwrap_or_default()))
}

/// Thousands grouped with dots, as in pt-BR.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

pub fn format_optional(value: Option<u64>) -> String {
    value.map_or_else(|| "—".to_string(), format_count)
}

fn format_total(sum: u64, defined: usize) -> String {
    if defined == 0 {
        "—".to_string()
    } else {
        format_count(sum)
    }
}

/// Decimal comma, as in pt-BR.
pub fn format_decimal(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}").replace('.', ",")
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const UNAVAILABLE_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <title>Eleições 2026</title>
  <style>
    body { margin: 0; min-height: 100vh; display: grid; place-items: center;
      background: hsl(222 47% 6%); color: hsl(210 40% 94%); font-family: "Inter", sans-serif; }
    .card { padding: 32px; border-radius: 12px; border: 1px solid hsl(0 72% 51%); background: hsl(222 44% 9%); }
  </style>
</head>
<body>
  <div class="card">
    <h1>Dados indisponíveis</h1>
    <p>Não foi possível carregar os dados eleitorais. Recarregue a página para tentar novamente.</p>
  </div>
</body>
</html>
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Eleições 2026 — Dep. Estadual RJ</title>
  <style>
    :root {
      --bg: hsl(222 47% 6%);
      --card: hsl(222 44% 9%);
      --border: hsl(215 32% 17%);
      --ink: hsl(210 40% 94%);
      --muted: hsl(215 20% 55%);
      --primary: hsl(45 93% 58%);
      --up: hsl(160 60% 45%);
      --down: hsl(0 72% 51%);
    }

    * { box-sizing: border-box; }

    body {
      margin: 0;
      background: var(--bg);
      color: var(--ink);
      font-family: "Inter", "Segoe UI", sans-serif;
    }

    header {
      position: sticky;
      top: 0;
      display: flex;
      justify-content: space-between;
      align-items: center;
      padding: 16px 24px;
      border-bottom: 1px solid var(--border);
      background: rgba(15, 20, 32, 0.85);
      backdrop-filter: blur(8px);
    }

    h1 { margin: 0; font-size: 1.25rem; }
    h1 span { color: var(--primary); }
    h3 { margin: 0 0 12px; font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.1em; color: var(--muted); }

    main { padding: 24px; display: grid; gap: 24px; }

    .grid { display: grid; gap: 16px; }
    .grid.four { grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); }
    .grid.three { grid-template-columns: repeat(auto-fit, minmax(280px, 1fr)); }
    .grid.charts { grid-template-columns: 2fr 1fr; }

    .card {
      background: var(--card);
      border: 1px solid var(--border);
      border-radius: 10px;
      padding: 20px;
    }

    .kpi .label { margin: 0; font-size: 0.75rem; text-transform: uppercase; letter-spacing: 0.1em; color: var(--muted); }
    .kpi .value { margin: 6px 0; font-size: 1.6rem; font-weight: 700; }

    .muted { color: var(--muted); font-size: 0.8rem; }
    .up { color: var(--up); }
    .down { color: var(--down); }
    .neutral { color: var(--muted); }
    .trend { margin: 8px 0 0; font-size: 0.8rem; font-weight: 600; }

    .rows { list-style: none; margin: 0; padding: 0; display: grid; gap: 8px; font-size: 0.9rem; }
    .rows li { display: flex; justify-content: space-between; gap: 12px; align-items: center; }
    ol.rows { list-style: decimal inside; }

    .filters { display: flex; flex-wrap: wrap; gap: 12px; align-items: center; }
    .filters input, .filters select, .filters button {
      background: var(--card);
      color: var(--ink);
      border: 1px solid var(--border);
      border-radius: 6px;
      padding: 8px 12px;
    }

    .years { display: flex; gap: 8px; margin-top: 12px; }
    .chip {
      padding: 6px 14px;
      border-radius: 999px;
      border: 1px solid var(--border);
      color: var(--muted);
      text-decoration: none;
      font-size: 0.85rem;
    }
    .chip.active { background: var(--primary); color: var(--bg); border-color: var(--primary); }
    .chip.locked { cursor: not-allowed; opacity: 0.8; }

    .legend { display: flex; gap: 16px; margin-bottom: 12px; font-size: 0.8rem; }
    .legend i, .legend-list i { display: inline-block; width: 10px; height: 10px; border-radius: 2px; margin-right: 6px; }

    .bar-row { display: grid; grid-template-columns: 130px 1fr auto; gap: 8px; align-items: center; margin-bottom: 6px; font-size: 0.8rem; }
    .bar-label { color: var(--muted); white-space: nowrap; overflow: hidden; text-overflow: ellipsis; }
    .bar-stack { display: grid; gap: 2px; }
    .bar { height: 6px; border-radius: 0 3px 3px 0; }
    .growth-track { position: relative; height: 10px; }
    .growth { position: absolute; height: 10px; }
    .growth.up { left: 50%; background: var(--up); border-radius: 0 4px 4px 0; }
    .growth.down { right: 50%; background: var(--down); border-radius: 4px 0 0 4px; }

    .donut {
      width: 220px;
      height: 220px;
      margin: 0 auto 16px;
      border-radius: 50%;
      -webkit-mask: radial-gradient(circle, transparent 44%, #000 45%);
      mask: radial-gradient(circle, transparent 44%, #000 45%);
    }

    .table-wrap { max-height: 500px; overflow: auto; padding: 0; }
    table { width: 100%; border-collapse: collapse; font-size: 0.85rem; font-variant-numeric: tabular-nums; }
    th { position: sticky; top: 0; background: var(--border); text-align: right; padding: 10px; font-size: 0.7rem; text-transform: uppercase; letter-spacing: 0.08em; color: var(--muted); }
    td { text-align: right; padding: 8px 10px; border-bottom: 1px solid var(--border); }
    th:nth-child(-n+2), td:nth-child(-n+2) { text-align: left; }
    .target { color: var(--primary); }

    @media (max-width: 900px) {
      .grid.charts { grid-template-columns: 1fr; }
    }
  </style>
</head>
<body>
  <header>
    <div>
      <h1>Eleições 2026 <span>— Dep. Estadual RJ</span></h1>
      <p class="muted">Painel de Metas e Análise Eleitoral · Atualizado em {{LOADED_AT}}</p>
    </div>
    <span class="muted">{{CITY_COUNT}} cidades monitoradas</span>
  </header>

  <main>
    <section class="grid four">{{KPIS}}</section>

    <section class="card">{{FILTERS}}</section>

    <section class="grid three">{{PERFORMANCE}}</section>

    <section class="grid charts">
      <div class="card">
        <h3>Comparativo de Votos — Top 15 Cidades</h3>
        {{VOTES_CHART}}
      </div>
      <div class="card">
        <h3>Distribuição de Eleitores</h3>
        {{ELECTORATE_CHART}}
      </div>
    </section>

    <section class="grid charts">
      <div class="card">
        <h3>Crescimento 2018 → 2022 (%)</h3>
        {{GROWTH_CHART}}
      </div>
      <div class="card">
        <h3>Maiores Metas 2026</h3>
        {{TARGETS}}
      </div>
    </section>

    <section class="card table-wrap">{{TABLE}}</section>
  </main>
</body>
</html>
"#;
