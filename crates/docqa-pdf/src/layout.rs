/// A piece of text drawn at one position. `y` is the baseline in PDF user
/// space (grows upwards); `width` is an estimate of the advance.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub text: String,
}

/// Group runs into lines and lines into page text.
///
/// Runs whose baselines are within `y_tolerance` of the previous run in the
/// same cluster share a line. Inside a line runs are ordered left to right
/// and separated by a space when the gap between the end of one and the
/// start of the next exceeds `x_tolerance`.
pub fn assemble_lines(mut runs: Vec<TextRun>, x_tolerance: f32, y_tolerance: f32) -> String {
    runs.retain(|r| !r.text.is_empty());
    runs.sort_by(|a, b| b.y.total_cmp(&a.y));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if line.last().is_some_and(|prev| (prev.y - run.y).abs() <= y_tolerance) => line.push(run),
            _ => lines.push(vec![run]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            join_line(&line, x_tolerance)
        })
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn join_line(line: &[TextRun], x_tolerance: f32) -> String {
    let mut out = String::new();
    let mut prev_end: Option<f32> = None;
    for run in line {
        if let Some(end) = prev_end {
            let gap = run.x - end;
            let spaced = out.ends_with(char::is_whitespace) || run.text.starts_with(char::is_whitespace);
            if gap > x_tolerance && !spaced {
                out.push(' ');
            }
        }
        out.push_str(&run.text);
        prev_end = Some(prev_end.map_or(run.x + run.width, |e| e.max(run.x + run.width)));
    }
    out.trim_end().to_string()
}
