// src/render/mod.rs
//
// Server-side HTML for the report pages. Tables get client-side search and
// pagination from one inline script; chart data is embedded as JSON and
// drawn by Chart.js in the browser.

use maud::{html, Markup, PreEscaped, DOCTYPE};
use serde::Serialize;

const CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js@4.4.1/dist/chart.umd.min.js";

pub const NAV: [(&str, &str); 5] = [
    ("/reports", "Overview"),
    ("/reports/students", "Students"),
    ("/reports/teachers", "Teachers"),
    ("/reports/courses", "Courses"),
    ("/reports/inactivity", "Inactivity"),
];

/// serde_json escapes quotes and backslashes; this also keeps every `<`,
/// `>` and `&` out of the inline block so no payload can change parser state.
pub fn escape_json_for_script(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Chart {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stacked: bool,
}

impl Chart {
    pub fn new(kind: &'static str, labels: Vec<String>) -> Self {
        Self { kind, labels, datasets: Vec::new(), stacked: false }
    }

    pub fn dataset(mut self, label: &str, data: Vec<f64>) -> Self {
        self.datasets.push(Dataset { label: label.to_string(), data });
        self
    }

    pub fn stacked(mut self) -> Self {
        self.stacked = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub empty_message: &'static str,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self { headers, rows: Vec::new(), empty_message: "No records for this school." }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }
}

pub struct Page {
    title: String,
    company: String,
    active_path: &'static str,
    window_days: i64,
    stats: Vec<(String, String)>,
    charts: Vec<(String, Chart)>,
    tables: Vec<Table>,
    page_size: usize,
}

impl Page {
    pub fn new(title: &str, company: &str, active_path: &'static str, window_days: i64) -> Self {
        Self {
            title: title.to_string(),
            company: company.to_string(),
            active_path,
            window_days,
            stats: Vec::new(),
            charts: Vec::new(),
            tables: Vec::new(),
            page_size: 25,
        }
    }

    pub fn page_size(mut self, n: usize) -> Self {
        self.page_size = n.max(1);
        self
    }

    pub fn stat(mut self, label: &str, value: impl ToString) -> Self {
        self.stats.push((label.to_string(), value.to_string()));
        self
    }

    pub fn chart(mut self, chart: Chart) -> Self {
        let id = format!("chart-{}", self.charts.len());
        self.charts.push((id, chart));
        self
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn render(&self) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) " · " (self.company) }
                    style { (PreEscaped(STYLE)) }
                    script src=(CHART_JS_URL) {}
                }
                body {
                    header {
                        h1 { (self.title) }
                        p.tenant { (self.company) " · last " (self.window_days) " days" }
                        nav {
                            @for (path, label) in NAV {
                                a href=(format!("{path}?days={}", self.window_days))
                                    class=[(path == self.active_path).then_some("active")] { (label) }
                            }
                        }
                    }
                    main {
                        @if !self.stats.is_empty() {
                            section.stats {
                                @for (label, value) in &self.stats {
                                    div.stat {
                                        span.value { (value) }
                                        span.label { (label) }
                                    }
                                }
                            }
                        }
                        @for (id, _) in &self.charts {
                            section.chart { canvas id=(id) {} }
                        }
                        @for table in &self.tables {
                            (render_table(table, self.page_size))
                        }
                    }
                    @if !self.charts.is_empty() {
                        script { "const CHARTS=" (PreEscaped(self.chart_payload())) ";" }
                    }
                    script { (PreEscaped(SCRIPT)) }
                }
            }
        }
    }

    fn chart_payload(&self) -> String {
        let entries: Vec<serde_json::Value> = self
            .charts
            .iter()
            .map(|(id, chart)| serde_json::json!({ "id": id, "chart": chart }))
            .collect();
        let data = serde_json::to_string(&entries).unwrap_or_else(|_| "[]".to_string());
        escape_json_for_script(&data)
    }
}

fn render_table(table: &Table, page_size: usize) -> Markup {
    html! {
        section.report {
            input.table-search type="search" placeholder="Search…";
            table.report-table data-page-size=(page_size) {
                thead { tr { @for h in &table.headers { th { (h) } } } }
                tbody {
                    @if table.rows.is_empty() {
                        tr.empty { td colspan=(table.headers.len().max(1)) { (table.empty_message) } }
                    }
                    @for row in &table.rows {
                        tr { @for cell in row { td { (cell) } } }
                    }
                }
            }
            div.pager {}
        }
    }
}

/// A short standalone page, used for access errors.
pub fn notice_page(title: &str, message: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                title { (title) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                main.notice {
                    h1 { (title) }
                    p { (message) }
                }
            }
        }
    }
}

pub fn fmt_pct(v: f64) -> String {
    format!("{v:.1}%")
}

pub fn fmt_score(v: f64) -> String {
    format!("{v:.1}")
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f5f6f8;color:#222}\
header{background:#1d3557;color:#fff;padding:1rem 2rem}header h1{margin:0}\
.tenant{margin:.25rem 0 .75rem;opacity:.8}nav a{color:#fff;margin-right:1rem;text-decoration:none}\
nav a.active{border-bottom:2px solid #fff}main{padding:1.5rem 2rem}\
.stats{display:flex;flex-wrap:wrap;gap:1rem;margin-bottom:1.5rem}\
.stat{background:#fff;border-radius:6px;padding:1rem 1.5rem;min-width:9rem;box-shadow:0 1px 2px #0002}\
.stat .value{display:block;font-size:1.6rem;font-weight:600}.stat .label{color:#666}\
.chart{background:#fff;border-radius:6px;padding:1rem;margin-bottom:1.5rem;max-width:960px}\
.report{background:#fff;border-radius:6px;padding:1rem;margin-bottom:1.5rem}\
.table-search{padding:.4rem;margin-bottom:.5rem;width:16rem}\
table{border-collapse:collapse;width:100%}th,td{padding:.4rem .6rem;border-bottom:1px solid #e3e3e3;text-align:left}\
th{background:#f0f2f5}.pager button{margin:.5rem .25rem 0 0}.notice{max-width:40rem;margin:4rem auto}";

const SCRIPT: &str = r#"
document.querySelectorAll('.report').forEach(function (section) {
  var table = section.querySelector('.report-table');
  var search = section.querySelector('.table-search');
  var pager = section.querySelector('.pager');
  var size = parseInt(table.dataset.pageSize, 10) || 25;
  var rows = Array.prototype.slice.call(table.tBodies[0].rows).filter(function (r) { return !r.classList.contains('empty'); });
  var page = 0;
  function matching() {
    var q = search.value.trim().toLowerCase();
    return rows.filter(function (r) { return !q || r.textContent.toLowerCase().indexOf(q) !== -1; });
  }
  function draw() {
    var hits = matching();
    var pages = Math.max(1, Math.ceil(hits.length / size));
    if (page >= pages) { page = pages - 1; }
    rows.forEach(function (r) { r.style.display = 'none'; });
    hits.slice(page * size, (page + 1) * size).forEach(function (r) { r.style.display = ''; });
    pager.innerHTML = '';
    for (var i = 0; i < pages && pages > 1; i++) {
      var b = document.createElement('button');
      b.textContent = i + 1;
      b.disabled = i === page;
      b.onclick = (function (n) { return function () { page = n; draw(); }; })(i);
      pager.appendChild(b);
    }
  }
  search.addEventListener('input', function () { page = 0; draw(); });
  draw();
});
if (typeof CHARTS !== 'undefined' && typeof Chart !== 'undefined') {
  CHARTS.forEach(function (entry) {
    var c = entry.chart;
    var scales = c.type === 'bar' ? { x: { stacked: !!c.stacked }, y: { stacked: !!c.stacked, beginAtZero: true } } : undefined;
    new Chart(document.getElementById(entry.id), {
      type: c.type,
      data: { labels: c.labels, datasets: c.datasets },
      options: { responsive: true, scales: scales }
    });
  });
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_text_is_escaped() {
        let mut table = Table::new(vec!["Name"]);
        table.row(vec!["<b>\"A&B\"</b>".into()]);
        let html = Page::new("T", "X", "/reports", 30).table(table).render().into_string();
        assert!(html.contains("<td>&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;</td>"));
    }

    #[test]
    fn script_payload_cannot_close_the_block() {
        let json = serde_json::to_string(&vec!["</script><script>alert(1)", "<!--<script"]).unwrap();
        let escaped = escape_json_for_script(&json);
        assert!(!escaped.contains('<'));
        assert!(escaped.contains("\\u003c!--\\u003cscript"));
        let back: Vec<String> = serde_json::from_str(&escaped).unwrap();
        assert_eq!(back[1], "<!--<script");
    }

    #[test]
    fn chart_labels_stay_inside_the_chart_block() {
        let html = Page::new("Courses", "X", "/reports/courses", 30)
            .chart(Chart::new("bar", vec!["<!--<script>".into()]).dataset("Enrolled", vec![1.0]))
            .render()
            .into_string();
        let block = html.split("const CHARTS=").nth(1).unwrap();
        let payload = block.split(";</script>").next().unwrap();
        assert!(!payload.contains('<'));
    }

    #[test]
    fn page_renders_tables_charts_and_nav() {
        let mut table = Table::new(vec!["Name", "Score"]);
        table.row(vec!["<Ann>".into(), "12.0".into()]);
        let html = Page::new("Students", "North & South", "/reports/students", 30)
            .page_size(10)
            .stat("Students", 1)
            .chart(Chart::new("bar", vec!["Ann".into()]).dataset("Score", vec![12.0]))
            .table(table)
            .render()
            .into_string();

        assert!(html.contains("North &amp; South"));
        assert!(html.contains("<td>&lt;Ann&gt;</td>"));
        assert!(html.contains("data-page-size=\"10\""));
        assert!(html.contains("const CHARTS=[{"));
        assert!(html.contains("href=\"/reports/students?days=30\" class=\"active\""));
    }

    #[test]
    fn empty_table_shows_message() {
        let html = Page::new("Courses", "X", "/reports/courses", 7)
            .table(Table::new(vec!["Course"]))
            .render()
            .into_string();
        assert!(html.contains("No records for this school."));
    }
}
