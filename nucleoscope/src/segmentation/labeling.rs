//! Connected component labeling using run-length union-find.
//!
//! Foreground pixels are grouped into horizontal runs, runs on adjacent rows
//! are merged with union-find, and final labels are handed out in raster
//! order of each component's first pixel, starting at 1. Label 0 is
//! background.

use common::Buffer2;

use super::config::Connectivity;

/// A horizontal run of foreground pixels.
#[derive(Debug, Clone, Copy)]
struct Run {
    start: u32, // inclusive
    end: u32,   // exclusive
    label: u32, // provisional
}

/// Check if two runs from adjacent rows are connected.
#[inline]
fn runs_connected(prev: &Run, curr: &Run, connectivity: Connectivity) -> bool {
    match connectivity {
        Connectivity::Four => prev.start < curr.end && prev.end > curr.start,
        Connectivity::Eight => prev.start < curr.end + 1 && prev.end + 1 > curr.start,
    }
}

fn extract_runs(row: &[bool], runs: &mut Vec<Run>) {
    runs.clear();
    let mut x = 0;
    while x < row.len() {
        if row[x] {
            let start = x;
            while x < row.len() && row[x] {
                x += 1;
            }
            runs.push(Run {
                start: start as u32,
                end: x as u32,
                label: 0,
            });
        } else {
            x += 1;
        }
    }
}

/// Union-find over provisional labels. Index 0 is reserved for background.
#[derive(Debug)]
struct UnionFind {
    parent: Vec<u32>,
}

impl UnionFind {
    fn new() -> Self {
        Self { parent: vec![0] }
    }

    fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    fn find(&mut self, mut label: u32) -> u32 {
        while self.parent[label as usize] != label {
            let grandparent = self.parent[self.parent[label as usize] as usize];
            self.parent[label as usize] = grandparent;
            label = grandparent;
        }
        label
    }

    /// The smaller root wins, so a component's root is its earliest run.
    fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra < rb {
            self.parent[rb as usize] = ra;
        } else if rb < ra {
            self.parent[ra as usize] = rb;
        }
    }
}

/// Per-pixel component labels of a binary mask.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    labels: Buffer2<u32>,
    num_labels: usize,
}

impl LabelMap {
    /// Label the connected components of `mask`.
    pub fn from_mask(mask: &Buffer2<bool>, connectivity: Connectivity) -> Self {
        let width = mask.width();
        let height = mask.height();

        let mut uf = UnionFind::new();
        let mut rows: Vec<Vec<Run>> = Vec::with_capacity(height);
        let mut curr = Vec::new();

        for y in 0..height {
            extract_runs(mask.row(y), &mut curr);
            let prev: &[Run] = if y > 0 { &rows[y - 1] } else { &[] };

            for run in curr.iter_mut() {
                let mut label = 0;
                for p in prev {
                    if runs_connected(p, run, connectivity) {
                        if label == 0 {
                            label = p.label;
                        } else {
                            uf.union(label, p.label);
                        }
                    }
                }
                run.label = if label == 0 { uf.make_set() } else { label };
            }
            rows.push(curr.clone());
        }

        // Resolve roots and renumber in raster order
        let mut final_labels = vec![0u32; uf.parent.len()];
        let mut next = 0u32;
        let mut labels = Buffer2::new_default(width, height);
        for (y, runs) in rows.iter().enumerate() {
            for run in runs {
                let root = uf.find(run.label) as usize;
                if final_labels[root] == 0 {
                    next += 1;
                    final_labels[root] = next;
                }
                let label = final_labels[root];
                for x in run.start..run.end {
                    labels[(x as usize, y)] = label;
                }
            }
        }

        Self {
            labels,
            num_labels: next as usize,
        }
    }

    pub fn labels(&self) -> &Buffer2<u32> {
        &self.labels
    }

    /// Number of components; labels run from 1 to `num_labels`.
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    /// Pixel count per label, indexed by label. Entry 0 counts background.
    pub fn component_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.num_labels + 1];
        for &label in self.labels.iter() {
            sizes[label as usize] += 1;
        }
        sizes
    }

    pub fn width(&self) -> usize {
        self.labels.width()
    }

    pub fn height(&self) -> usize {
        self.labels.height()
    }
}

/// Drop 4-connected components smaller than `min_area` pixels.
pub fn remove_small_objects(mask: &Buffer2<bool>, min_area: usize) -> Buffer2<bool> {
    let map = LabelMap::from_mask(mask, Connectivity::Four);
    let sizes = map.component_sizes();
    map.labels
        .map(|&label| label != 0 && sizes[label as usize] >= min_area)
}

/// Drop 8-connected components that touch the image border.
pub fn clear_border(mask: &Buffer2<bool>) -> Buffer2<bool> {
    let map = LabelMap::from_mask(mask, Connectivity::Eight);
    let labels = &map.labels;
    let (width, height) = (labels.width(), labels.height());

    let mut touches = vec![false; map.num_labels + 1];
    for x in 0..width {
        touches[labels[(x, 0)] as usize] = true;
        touches[labels[(x, height - 1)] as usize] = true;
    }
    for y in 0..height {
        touches[labels[(0, y)] as usize] = true;
        touches[labels[(width - 1, y)] as usize] = true;
    }

    labels.map(|&label| label != 0 && !touches[label as usize])
}
