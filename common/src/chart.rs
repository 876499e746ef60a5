use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use eyre::Result;
use plotters::{
    coord::Shift,
    prelude::*,
    style::{
        FontStyle, register_font,
        text_anchor::{HPos, Pos, VPos},
    },
};
use thiserror::Error;
use tracing::debug;

pub const BACKGROUND: RGBColor = RGBColor(0x1a, 0x1a, 0x2e);
pub const PANEL: RGBColor = RGBColor(0x16, 0x21, 0x3e);
pub const EDGE: RGBColor = RGBColor(0x33, 0x33, 0x33);
pub const FALLBACK: RGBColor = RGBColor(0xaa, 0xaa, 0xaa);
pub const SUCCESS: RGBColor = RGBColor(0x2e, 0xcc, 0x71);
pub const FAILURE: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);

/// 8x5, 10x5, 12x5 and 14x5 inch figures at 150 dpi
pub const SINGLE: (u32, u32) = (1200, 750);
pub const WIDE: (u32, u32) = (1500, 750);
pub const ROW: (u32, u32) = (1800, 750);
pub const DOUBLE: (u32, u32) = (2100, 750);

const FONT: &str = "sans-serif";

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static LOADED_FONT: OnceLock<PathBuf> = OnceLock::new();

pub type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no usable TrueType font found, searched: {searched}")]
    FontUnavailable { searched: String },
    #[error("font {0} could not be loaded")]
    InvalidFont(PathBuf),
    #[error("test render failed: {0}")]
    Probe(String),
}

/// Loads the chart font and checks that text can be rendered.
///
/// Charts cannot be drawn without this, callers should treat an error as
/// fatal.
pub fn init_renderer(font: Option<&Path>) -> Result<PathBuf, ChartError> {
    if let Some(path) = LOADED_FONT.get() {
        return Ok(path.clone());
    }

    let candidates = match font {
        Some(path) => vec![path.to_path_buf()],
        None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
    };
    let (path, bytes) = candidates
        .iter()
        .find_map(|path| fs::read(path).ok().map(|bytes| (path.clone(), bytes)))
        .ok_or_else(|| ChartError::FontUnavailable {
            searched: candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })?;

    // plotters keeps registered fonts for the lifetime of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT, FontStyle::Normal, bytes)
        .map_err(|_| ChartError::InvalidFont(path.clone()))?;

    let mut buffer = vec![0u8; 64 * 32 * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (64, 32)).into_drawing_area();
        root.draw(&Text::new("0.0", (2, 2), text(12.0, &WHITE)))
            .map_err(|err| ChartError::Probe(err.to_string()))?;
        root.present()
            .map_err(|err| ChartError::Probe(err.to_string()))?;
    }

    debug!("Using font {}", path.display());
    Ok(LOADED_FONT.get_or_init(|| path).clone())
}

pub fn runtime_color(runtime: &str) -> RGBColor {
    match runtime {
        "bare" => RGBColor(0x6c, 0x75, 0x7d),
        "docker" => RGBColor(0x0d, 0xb7, 0xed),
        "podman" => RGBColor(0x89, 0x2c, 0xa0),
        _ => FALLBACK,
    }
}

pub fn text(size: f64, color: &RGBColor) -> TextStyle<'static> {
    (FONT, size).into_font().color(color)
}

/// Draws into a PNG at `path`, splitting the canvas into `panels` columns
pub fn render<F>(path: &Path, size: (u32, u32), panels: usize, draw: F) -> Result<()>
where
    F: FnOnce(&Area, &[Area]) -> Result<()>,
{
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&BACKGROUND)?;
    let areas = if panels > 1 {
        root.split_evenly((1, panels))
    } else {
        vec![root.clone()]
    };
    draw(&root, &areas)?;
    root.present()?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Bar {
    /// Center of the bar on the category axis
    pub x: f64,
    pub width: f64,
    pub value: f64,
    pub color: RGBColor,
    pub label: String,
    pub label_color: RGBColor,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub x: f64,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BarChart {
    pub title: String,
    pub y_desc: String,
    pub categories: Vec<Category>,
    pub bars: Vec<Bar>,
    pub legend: Vec<(String, RGBColor)>,
}

/// One series of a grouped bar chart, `None` where the category has no value
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub name: String,
    pub color: RGBColor,
    pub values: Vec<Option<f64>>,
}

impl BarChart {
    /// One colored bar per entry, labelled with `fmt(value)`
    pub fn simple<F>(title: &str, y_desc: &str, entries: &[(String, f64, RGBColor)], fmt: F) -> Self
    where
        F: Fn(f64) -> String,
    {
        let mut chart = Self {
            title: title.to_owned(),
            y_desc: y_desc.to_owned(),
            ..Default::default()
        };
        for (idx, (name, value, color)) in entries.iter().enumerate() {
            let x = idx as f64;
            chart.categories.push(Category {
                x,
                lines: vec![name.clone()],
            });
            chart.bars.push(Bar {
                x,
                width: 0.8,
                value: *value,
                color: *color,
                label: fmt(*value),
                label_color: WHITE,
            });
        }
        chart
    }

    /// Series side by side within each category, each `width` wide
    pub fn grouped<F>(
        title: &str,
        y_desc: &str,
        categories: Vec<String>,
        series: &[BarSeries],
        width: f64,
        fmt: F,
    ) -> Self
    where
        F: Fn(f64) -> String,
    {
        let center = (series.len() as f64 - 1.0) / 2.0;
        let mut chart = Self {
            title: title.to_owned(),
            y_desc: y_desc.to_owned(),
            categories: categories
                .into_iter()
                .enumerate()
                .map(|(idx, name)| Category {
                    x: idx as f64,
                    lines: vec![name],
                })
                .collect(),
            legend: series.iter().map(|s| (s.name.clone(), s.color)).collect(),
            ..Default::default()
        };
        for (idx, s) in series.iter().enumerate() {
            let offset = (idx as f64 - center) * width;
            for (cat, value) in s.values.iter().enumerate() {
                let Some(value) = value else {
                    continue;
                };
                chart.bars.push(Bar {
                    x: cat as f64 + offset,
                    width,
                    value: *value,
                    color: s.color,
                    label: fmt(*value),
                    label_color: WHITE,
                });
            }
        }
        chart
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = hi - lo;
    if span <= 0.0 {
        return (0.0, 1.0);
    }
    let pad = span * 0.12;
    (if lo < 0.0 { lo - pad } else { lo }, hi + pad)
}

pub fn draw_bars(root: &Area, area: &Area, chart: &BarChart) -> Result<()> {
    let (lo, hi) = value_range(chart.bars.iter().map(|b| b.value));
    let n = chart.categories.len().max(1) as f64;

    let mut ctx = ChartBuilder::on(area)
        .caption(&chart.title, text(26.0, &WHITE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..(n - 0.5), lo..hi)?;
    ctx.plotting_area().fill(&PANEL)?;
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|_| String::new())
        .light_line_style(PANEL)
        .bold_line_style(EDGE)
        .axis_style(EDGE)
        .y_desc(chart.y_desc.as_str())
        .label_style(text(16.0, &WHITE))
        .axis_desc_style(text(18.0, &WHITE))
        .draw()?;

    ctx.draw_series(chart.bars.iter().map(|bar| {
        Rectangle::new(
            [(bar.x - bar.width / 2.0, 0.0), (bar.x + bar.width / 2.0, bar.value)],
            bar.color.filled(),
        )
    }))?;
    ctx.draw_series(chart.bars.iter().map(|bar| {
        Rectangle::new(
            [(bar.x - bar.width / 2.0, 0.0), (bar.x + bar.width / 2.0, bar.value)],
            EDGE.stroke_width(1),
        )
    }))?;

    let plot = ctx.plotting_area();
    for bar in &chart.bars {
        let (px, py) = plot.map_coordinate(&(bar.x, bar.value));
        let (dy, anchor) = if bar.value >= 0.0 {
            (-4, VPos::Bottom)
        } else {
            (4, VPos::Top)
        };
        root.draw(&Text::new(
            bar.label.clone(),
            (px, py + dy),
            text(15.0, &bar.label_color).pos(Pos::new(HPos::Center, anchor)),
        ))?;
    }

    for category in &chart.categories {
        let (px, py) = plot.map_coordinate(&(category.x, lo));
        for (idx, line) in category.lines.iter().enumerate() {
            root.draw(&Text::new(
                line.clone(),
                (px, py + 8 + idx as i32 * 20),
                text(16.0, &WHITE).pos(Pos::new(HPos::Center, VPos::Top)),
            ))?;
        }
    }

    if !chart.legend.is_empty() {
        let (xs, ys) = plot.get_pixel_range();
        draw_legend(root, (xs.end - 260, ys.start + 12), &chart.legend)?;
    }
    Ok(())
}

/// Boxed legend with one filled swatch per entry, top-left corner at `origin`
pub fn draw_legend(root: &Area, origin: (i32, i32), entries: &[(String, RGBColor)]) -> Result<()> {
    let (x, y) = origin;
    let height = entries.len() as i32 * 26 + 12;
    root.draw(&Rectangle::new([(x, y), (x + 248, y + height)], PANEL.filled()))?;
    root.draw(&Rectangle::new([(x, y), (x + 248, y + height)], EDGE.stroke_width(1)))?;
    for (idx, (name, color)) in entries.iter().enumerate() {
        let top = y + 8 + idx as i32 * 26;
        root.draw(&Rectangle::new([(x + 10, top), (x + 30, top + 18)], color.filled()))?;
        root.draw(&Text::new(
            name.clone(),
            (x + 40, top + 9),
            text(15.0, &WHITE).pos(Pos::new(HPos::Left, VPos::Center)),
        ))?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Line {
    pub name: String,
    pub color: RGBColor,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct LineChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub lines: Vec<Line>,
    /// Per-point label, `None` draws no labels
    pub point_label: Option<fn(f64) -> String>,
}

impl LineChart {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.points.is_empty())
    }
}

pub fn draw_lines(root: &Area, area: &Area, chart: &LineChart) -> Result<()> {
    let points = chart.lines.iter().flat_map(|l| l.points.iter().copied());
    let (x_lo, x_hi, y_hi) = points.fold(
        (f64::MAX, f64::MIN, 0.0f64),
        |(x_lo, x_hi, y_hi), (x, y)| (x_lo.min(x), x_hi.max(x), y_hi.max(y)),
    );
    let (x_lo, x_hi) = if x_lo > x_hi {
        (0.0, 1.0)
    } else {
        let pad = ((x_hi - x_lo) * 0.05).max(0.5);
        (x_lo - pad, x_hi + pad)
    };
    let y_hi = if y_hi > 0.0 { y_hi * 1.15 } else { 1.0 };

    let mut ctx = ChartBuilder::on(area)
        .caption(&chart.title, text(26.0, &WHITE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(x_lo..x_hi, 0f64..y_hi)?;
    ctx.plotting_area().fill(&PANEL)?;
    ctx.configure_mesh()
        .light_line_style(PANEL)
        .bold_line_style(EDGE)
        .axis_style(EDGE)
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .label_style(text(16.0, &WHITE))
        .axis_desc_style(text(18.0, &WHITE))
        .draw()?;

    for line in &chart.lines {
        let color = line.color;
        ctx.draw_series(LineSeries::new(line.points.clone(), color.stroke_width(3)))?
            .label(line.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
        ctx.draw_series(line.points.iter().map(|&p| Circle::new(p, 7, color.filled())))?;
    }

    if let Some(fmt) = chart.point_label {
        let plot = ctx.plotting_area();
        for &(x, y) in chart.lines.iter().flat_map(|l| l.points.iter()) {
            let (px, py) = plot.map_coordinate(&(x, y));
            root.draw(&Text::new(
                fmt(y),
                (px, py - 12),
                text(14.0, &WHITE).pos(Pos::new(HPos::Center, VPos::Bottom)),
            ))?;
        }
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(PANEL)
        .border_style(EDGE)
        .label_font(text(15.0, &WHITE))
        .draw()?;
    Ok(())
}
