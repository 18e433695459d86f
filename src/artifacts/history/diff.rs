//! Line-level diff
//!
//! Classic LCS over line sequences, producing context/added/removed
//! records with line numbers for both sides. Files beyond a size
//! threshold are diffed in fixed windows to bound the quadratic table;
//! matches crossing a window boundary may be missed, which trades some
//! minimality for bounded memory. Hunk grouping expands change regions
//! with context lines and merges overlaps.

/// Above this many lines the diff switches to windowed mode
pub const WINDOWED_THRESHOLD: usize = 10_000;

/// Window size used in windowed mode
pub const WINDOW_SIZE: usize = 1_000;

/// Context lines around each hunk
pub const DEFAULT_CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Context,
    Added,
    Removed,
}

impl DiffLineKind {
    pub fn sigil(&self) -> char {
        match self {
            DiffLineKind::Context => ' ',
            DiffLineKind::Added => '+',
            DiffLineKind::Removed => '-',
        }
    }
}

/// One output line with its position in each file (1-based; absent on
/// the side the line does not exist in)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub content: String,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

/// A group of nearby changes with surrounding context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_count, self.new_start, self.new_count
        )
    }
}

/// Diff between two versions of one file
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,
    pub lines: Vec<DiffLine>,
}

impl FileDiff {
    pub fn has_changes(&self) -> bool {
        self.lines
            .iter()
            .any(|line| line.kind != DiffLineKind::Context)
    }

    pub fn hunks(&self, context: usize) -> Vec<Hunk> {
        group_hunks(&self.lines, context)
    }
}

pub fn split_lines(content: &[u8]) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    String::from_utf8_lossy(content)
        .lines()
        .map(|line| line.to_string())
        .collect()
}

/// Compute the line diff between two file contents
pub fn diff_files(
    old_content: &[u8],
    new_content: &[u8],
    old_path: &str,
    new_path: &str,
) -> FileDiff {
    let old_lines = split_lines(old_content);
    let new_lines = split_lines(new_content);

    let lines = if old_lines.len().max(new_lines.len()) > WINDOWED_THRESHOLD {
        diff_windowed(&old_lines, &new_lines)
    } else {
        diff_lines(&old_lines, &new_lines, 0, 0)
    };

    FileDiff {
        old_path: old_path.to_string(),
        new_path: new_path.to_string(),
        lines,
    }
}

/// LCS diff of two line slices, with line numbers offset by the given
/// starting positions (used by windowing).
fn diff_lines(
    old_lines: &[String],
    new_lines: &[String],
    old_base: usize,
    new_base: usize,
) -> Vec<DiffLine> {
    let table = lcs_table(old_lines, new_lines);
    let mut result = Vec::new();

    let mut i = old_lines.len();
    let mut j = new_lines.len();

    // backtrack from the table's far corner, emitting lines in reverse
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && old_lines[i - 1] == new_lines[j - 1] {
            result.push(DiffLine {
                kind: DiffLineKind::Context,
                content: old_lines[i - 1].clone(),
                old_line: Some(old_base + i),
                new_line: Some(new_base + j),
            });
            i -= 1;
            j -= 1;
        } else if i > 0 && (j == 0 || table[i - 1][j] >= table[i][j - 1]) {
            result.push(DiffLine {
                kind: DiffLineKind::Removed,
                content: old_lines[i - 1].clone(),
                old_line: Some(old_base + i),
                new_line: None,
            });
            i -= 1;
        } else {
            result.push(DiffLine {
                kind: DiffLineKind::Added,
                content: new_lines[j - 1].clone(),
                old_line: None,
                new_line: Some(new_base + j),
            });
            j -= 1;
        }
    }

    result.reverse();
    result
}

fn lcs_table(old_lines: &[String], new_lines: &[String]) -> Vec<Vec<u32>> {
    let rows = old_lines.len();
    let columns = new_lines.len();
    let mut table = vec![vec![0u32; columns + 1]; rows + 1];

    for i in 1..=rows {
        for j in 1..=columns {
            table[i][j] = if old_lines[i - 1] == new_lines[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }

    table
}

/// Per-window LCS for very large files
fn diff_windowed(old_lines: &[String], new_lines: &[String]) -> Vec<DiffLine> {
    let mut result = Vec::new();
    let mut old_offset = 0;
    let mut new_offset = 0;

    while old_offset < old_lines.len() || new_offset < new_lines.len() {
        let old_end = (old_offset + WINDOW_SIZE).min(old_lines.len());
        let new_end = (new_offset + WINDOW_SIZE).min(new_lines.len());

        result.extend(diff_lines(
            &old_lines[old_offset..old_end],
            &new_lines[new_offset..new_end],
            old_offset,
            new_offset,
        ));

        old_offset = old_end;
        new_offset = new_end;
    }

    result
}

/// Group contiguous changes into hunks with `context` surrounding lines,
/// merging hunks whose context overlaps.
pub fn group_hunks(lines: &[DiffLine], context: usize) -> Vec<Hunk> {
    let change_positions: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.kind != DiffLineKind::Context)
        .map(|(position, _)| position)
        .collect();

    if change_positions.is_empty() {
        return Vec::new();
    }

    // merge change regions whose expanded context would overlap
    let mut regions: Vec<(usize, usize)> = Vec::new();
    for &position in &change_positions {
        let start = position.saturating_sub(context);
        let end = (position + context + 1).min(lines.len());
        match regions.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = end.max(*last_end),
            _ => regions.push((start, end)),
        }
    }

    regions
        .into_iter()
        .map(|(start, end)| build_hunk(&lines[start..end]))
        .collect()
}

fn build_hunk(lines: &[DiffLine]) -> Hunk {
    let old_start = lines
        .iter()
        .find_map(|line| line.old_line)
        .unwrap_or(0);
    let new_start = lines
        .iter()
        .find_map(|line| line.new_line)
        .unwrap_or(0);
    let old_count = lines.iter().filter(|line| line.old_line.is_some()).count();
    let new_count = lines.iter().filter(|line| line.new_line.is_some()).count();

    Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines: lines.to_vec(),
    }
}
