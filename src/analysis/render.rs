//! Text rendering of a utilization series with switch markers.

use std::io::Write;

use crate::constants::render::{LEVELS, SWITCH_MARKER};
use crate::error::Result;
use crate::types::{Series, SwitchEvent};

/// Draws a series with one line per core and the switch instants overlaid.
pub trait Renderer {
    fn render(&mut self, series: &Series, events: &[SwitchEvent]) -> Result<()>;
}

/// Sparkline renderer for terminals and logs.
///
/// Each core gets a line of block glyphs (one per time bucket) followed by a marker
/// line; the marker line is identical for every core so the switch instants can be
/// read against any of them. Events outside the series' time range are not drawn.
pub struct TextRenderer<W: Write> {
    out: W,
    width: usize,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(1),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, series: &Series, events: &[SwitchEvent]) -> Result<()> {
        let Some((start, end)) = series.time_range() else {
            writeln!(self.out, "(no samples)")?;
            return Ok(());
        };

        let buckets = self.width.min(series.len());
        let markers = marker_line(events, start, end, buckets);

        writeln!(
            self.out,
            "CPU usage over {:.1}s: {} samples, {} cores, {} switch events",
            end - start,
            series.len(),
            series.core_count(),
            events.len()
        )?;

        for (core, column) in series.per_core_columns().iter().enumerate() {
            let line: String = resample(column, buckets).into_iter().map(glyph).collect();
            let (min, mean, max) = column_stats(column);
            writeln!(
                self.out,
                "cpu{:<3} [{}] min {:5.1} mean {:5.1} max {:5.1}",
                core, line, min, mean, max
            )?;
            writeln!(self.out, "       [{}]", markers)?;
        }

        self.out.flush()?;
        Ok(())
    }
}

/// Average `values` down to `buckets` points; shorter inputs are returned as is.
fn resample(values: &[f64], buckets: usize) -> Vec<f64> {
    if buckets == 0 || values.len() <= buckets {
        return values.to_vec();
    }

    (0..buckets)
        .map(|b| {
            let lo = b * values.len() / buckets;
            let hi = ((b + 1) * values.len() / buckets).max(lo + 1);
            let slice = &values[lo..hi];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

fn marker_line(events: &[SwitchEvent], start: f64, end: f64, buckets: usize) -> String {
    let mut line = vec![' '; buckets];
    for event in events {
        if event.timestamp < start || event.timestamp > end || buckets == 0 {
            continue;
        }
        let column = if end > start {
            ((event.timestamp - start) / (end - start) * buckets as f64) as usize
        } else {
            0
        };
        line[column.min(buckets - 1)] = SWITCH_MARKER;
    }
    line.into_iter().collect()
}

fn glyph(percent: f64) -> char {
    let top = (LEVELS.len() - 1) as f64;
    let level = (percent.clamp(0.0, 100.0) / 100.0 * top).round() as usize;
    LEVELS[level]
}

fn column_stats(column: &[f64]) -> (f64, f64, f64) {
    let min = column.iter().copied().fold(f64::INFINITY, f64::min);
    let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = column.iter().sum::<f64>() / column.len().max(1) as f64;
    (min, mean, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UtilizationSample;

    fn render_to_string(series: &Series, events: &[SwitchEvent], width: usize) -> String {
        let mut renderer = TextRenderer::new(Vec::new(), width);
        renderer.render(series, events).unwrap();
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    fn inner(line: &str) -> String {
        let open = line.find('[').unwrap();
        let close = line.find(']').unwrap();
        line[open + 1..close].to_string()
    }

    fn two_core_series(samples: usize) -> Series {
        Series::new(
            (0..samples)
                .map(|i| {
                    let busy = if i < samples / 2 { 100.0 } else { 0.0 };
                    UtilizationSample::new(i as f64, vec![busy, 100.0 - busy])
                })
                .collect(),
        )
    }

    #[test]
    fn test_one_line_per_core_with_identical_markers() {
        let series = two_core_series(8);
        let events = [
            SwitchEvent {
                timestamp: 0.0,
                core_index: 0,
            },
            SwitchEvent {
                timestamp: 4.0,
                core_index: 1,
            },
        ];

        let text = render_to_string(&series, &events, 72);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("2 cores"));
        assert!(lines[1].starts_with("cpu0"));
        assert!(lines[3].starts_with("cpu1"));
        assert_eq!(lines[2], lines[4]);
        assert_eq!(inner(lines[2]).matches(SWITCH_MARKER).count(), 2);
        assert_eq!(inner(lines[1]), "████    ");
        assert_eq!(inner(lines[3]), "    ████");
    }

    #[test]
    fn test_long_series_is_resampled_to_width() {
        let series = two_core_series(100);
        let text = render_to_string(&series, &[], 10);
        let first_core = text.lines().nth(1).unwrap();

        assert_eq!(inner(first_core).chars().count(), 10);
        assert!(first_core.contains("max 100.0"));
    }

    #[test]
    fn test_out_of_range_events_not_drawn() {
        let series = two_core_series(4);
        let events = [SwitchEvent {
            timestamp: 50.0,
            core_index: 0,
        }];

        let text = render_to_string(&series, &events, 72);
        let markers = text.lines().nth(2).unwrap();
        assert!(!markers.contains(SWITCH_MARKER));
    }

    #[test]
    fn test_resample_and_glyph() {
        assert_eq!(resample(&[0.0, 10.0, 20.0, 30.0], 2), vec![5.0, 25.0]);
        assert_eq!(resample(&[1.0, 2.0], 8), vec![1.0, 2.0]);
        assert_eq!(glyph(0.0), ' ');
        assert_eq!(glyph(100.0), '█');
        assert_eq!(glyph(250.0), '█');
    }
}
