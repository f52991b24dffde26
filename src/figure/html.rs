use std::path::Path;

use anyhow::Context;

use crate::figure::Figure;

pub const PAGE_TITLE: &str = "3D Chromosome Plot";
const PLOT_DIV_ID: &str = "chromosome-plot";

/// Render a standalone single-page dashboard: heading plus the figure in
/// a centered, viewport-sized box. The figure is embedded with fluid
/// sizing so it follows the box.
pub fn render_dashboard(figure: &Figure, title: &str) -> anyhow::Result<String> {
    let figure_json = figure
        .responsive()
        .to_json()
        .context("Cannot serialize figure")?
        // Keep a stray "</script>" inside data from closing the tag.
        .replace("</", "<\\/");

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
    <style>
        body {{
            margin: 0;
            background-color: #111111;
            font-family: sans-serif;
        }}
        .page {{
            min-height: 100vh;
            width: 100%;
            display: flex;
            flex-direction: column;
            justify-content: center;
            align-items: center;
        }}
        h1 {{
            color: white;
            text-align: center;
            margin: 10px 0;
            padding: 10px;
        }}
        .plot-box {{
            display: flex;
            justify-content: center;
            align-items: center;
            width: 100%;
            height: calc(100vh - 100px);
        }}
        #{div_id} {{
            width: 95vw;
            height: 90vh;
            margin: auto;
        }}
    </style>
</head>
<body>
    <div class="page">
        <h1>{title}</h1>
        <div class="plot-box">
            <div id="{div_id}"></div>
        </div>
    </div>
    <script>
        const figure = {figure_json};
        Plotly.newPlot('{div_id}', figure.data, figure.layout, {{responsive: true}});
    </script>
</body>
</html>
"#,
        title = escape_html(title),
        div_id = PLOT_DIV_ID,
        figure_json = figure_json,
    ))
}

pub fn export_dashboard(figure: &Figure, path: &Path) -> anyhow::Result<()> {
    let html = render_dashboard(figure, PAGE_TITLE)?;
    std::fs::write(path, html).with_context(|| format!("Cannot write {}", path.display()))?;
    tracing::info!("Exported dashboard to {:?}", path);
    Ok(())
}

pub fn export_json(figure: &Figure, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(figure).context("Cannot serialize figure")?;
    std::fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
    tracing::info!("Exported figure JSON to {:?}", path);
    Ok(())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::{ColumnTable, FeatureTable, SurfaceCloud};
    use crate::figure::builder::{build_chromosome_figure, FigureStyle};

    fn figure() -> Figure {
        let features = FeatureTable::new(
            ColumnTable::new(
                vec!["x", "y", "z", "gc"].into_iter().map(String::from).collect(),
                vec![vec![0.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0], vec![0.1, 0.2]],
            )
            .unwrap(),
        )
        .unwrap();
        let surface = SurfaceCloud { x: vec![2.0], y: vec![2.0], z: vec![2.0] };
        build_chromosome_figure(&features, &surface, &["gc"], &FigureStyle::default()).unwrap()
    }

    #[test]
    fn test_dashboard_embeds_responsive_figure() {
        let html = render_dashboard(&figure(), PAGE_TITLE).unwrap();
        assert!(html.contains("<h1>3D Chromosome Plot</h1>"));
        assert!(html.contains("Plotly.newPlot('chromosome-plot'"));
        assert!(html.contains("\"autosize\":true"));
        assert!(!html.contains("\"width\":1000"));
    }

    #[test]
    fn test_title_is_escaped() {
        let html = render_dashboard(&figure(), "<b>&</b>").unwrap();
        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let html_path = dir.path().join("plot.html");
        let json_path = dir.path().join("plot.json");
        export_dashboard(&figure(), &html_path).unwrap();
        export_json(&figure(), &json_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["data"][1]["name"], "Surface Points");
        assert!(std::fs::read_to_string(&html_path).unwrap().contains("Toggle Surface Points"));
    }
}
