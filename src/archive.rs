//! Solution Archive: bounded, energy-ranked store of distinct solutions.
//!
//! The archive keeps the best `capacity` distinct solutions seen so far, sorted by
//! energy (highest first). Recording a solution classifies it; the decomposition
//! loop uses that classification to decide when it is stuck. The "diversity"
//! variant also reads the archive back: columns on which archived solutions
//! disagree become the next backbone, and the per-column majority seeds a start.

use crate::error::SolveError;
use crate::solution::hamming_distance;

/// A solution stored in the archive.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveEntry {
    /// The assignment.
    pub solution: Vec<u8>,
    /// Its energy (higher is better).
    pub energy: f64,
    /// How many times this exact assignment has been recorded.
    pub count: u32,
}

/// How a recorded solution relates to what the archive already held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordCode {
    /// Strictly better than every archived solution.
    NewHigh,
    /// Ties the best energy (either the same assignment again or a new one).
    DuplicateHighest,
    /// Same assignment as an archived entry below the best.
    DuplicateEnergy,
    /// New assignment at an energy level the archive already holds below the best.
    DuplicateEnergyUnique,
    /// New assignment at a new energy level inside the archive's range.
    NewEnergyUnique,
    /// Worse than everything in a full archive; discarded.
    Nothing,
}

/// Result of [`SolutionArchive::record`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Classification.
    pub code: RecordCode,
    /// Duplicate count of the matching entry after recording (0 if discarded).
    pub count: u32,
    /// Rank of the matching entry (0 is best); the archive length if discarded.
    pub pos: usize,
}

/// Summary of archive contents.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveStats {
    /// Number of entries.
    pub count: usize,
    /// Best energy (`NEG_INFINITY` when empty).
    pub best_energy: f64,
    /// Worst energy (`NEG_INFINITY` when empty).
    pub worst_energy: f64,
    /// Mean energy.
    pub mean_energy: f64,
    /// Mean pairwise Hamming distance.
    pub mean_diversity: f64,
}

impl std::fmt::Display for ArchiveStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Archive: {} entries, best={:.5}, worst={:.5}, mean={:.3}, diversity={:.1}",
            self.count, self.best_energy, self.worst_energy, self.mean_energy, self.mean_diversity
        )
    }
}

/// Bounded archive of distinct solutions, sorted by descending energy.
#[derive(Clone, Debug)]
pub struct SolutionArchive {
    entries: Vec<ArchiveEntry>,
    capacity: usize,
}

impl SolutionArchive {
    /// Creates an empty archive holding at most `capacity` entries.
    ///
    /// # Errors
    /// Returns [`SolveError::InvalidArchiveCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, SolveError> {
        if capacity == 0 {
            return Err(SolveError::InvalidArchiveCapacity);
        }
        Ok(Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, best first.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Consumes the archive, returning its entries best first.
    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }

    /// The best entry.
    pub fn best(&self) -> Option<&ArchiveEntry> {
        self.entries.first()
    }

    /// Best archived energy, `NEG_INFINITY` when empty.
    pub fn best_energy(&self) -> f64 {
        self.best().map_or(f64::NEG_INFINITY, |e| e.energy)
    }

    /// Records `solution` at `energy` and classifies it.
    pub fn record(&mut self, solution: &[u8], energy: f64) -> RecordOutcome {
        let best = self.best_energy();
        let full = self.entries.len() >= self.capacity;

        if self.entries.is_empty() || energy > best {
            let pos = self.insert(solution, energy);
            return RecordOutcome {
                code: RecordCode::NewHigh,
                count: 1,
                pos,
            };
        }

        let worst = self.entries.last().map_or(f64::NEG_INFINITY, |e| e.energy);
        if full && energy < worst {
            return RecordOutcome {
                code: RecordCode::Nothing,
                count: 0,
                pos: self.entries.len(),
            };
        }

        let ties_best = energy == best;
        let mut level_exists = false;
        for (pos, entry) in self.entries.iter_mut().enumerate() {
            if entry.energy != energy {
                continue;
            }
            level_exists = true;
            if entry.solution == solution {
                entry.count += 1;
                let code = if ties_best {
                    RecordCode::DuplicateHighest
                } else {
                    RecordCode::DuplicateEnergy
                };
                return RecordOutcome {
                    code,
                    count: entry.count,
                    pos,
                };
            }
        }

        let pos = self.insert(solution, energy);
        let code = match (ties_best, level_exists) {
            (true, _) => RecordCode::DuplicateHighest,
            (false, true) => RecordCode::DuplicateEnergyUnique,
            (false, false) => RecordCode::NewEnergyUnique,
        };
        RecordOutcome { code, count: 1, pos }
    }

    /// Inserts after every entry with energy `>= energy`, evicting the worst when full.
    fn insert(&mut self, solution: &[u8], energy: f64) -> usize {
        if self.entries.len() >= self.capacity {
            self.entries.pop();
        }
        let pos = self.entries.partition_point(|e| e.energy >= energy);
        self.entries.insert(
            pos,
            ArchiveEntry {
                solution: solution.to_vec(),
                energy,
                count: 1,
            },
        );
        debug_assert!(self.entries.windows(2).all(|w| w[0].energy >= w[1].energy));
        pos
    }

    /// Per-column count of ones across all entries, and the minority count.
    fn column_counts(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let k = self.entries.len();
        let n = self.entries.first().map_or(0, |e| e.solution.len());
        let half = k.div_ceil(2);
        (0..n).map(move |c| {
            let ones = self.entries.iter().filter(|e| e.solution[c] == 1).count();
            let minority = if ones + 1 > half { k - ones } else { ones };
            (ones, minority)
        })
    }

    /// Columns on which more than `delta` archived solutions disagree with the majority.
    pub fn diff_columns(&self, delta: usize) -> Vec<usize> {
        self.column_counts()
            .enumerate()
            .filter(|(_, (_, minority))| *minority > delta)
            .map(|(c, _)| c)
            .collect()
    }

    /// Builds a solution from the archive's columns.
    ///
    /// Each bit takes the majority value (ties go to `1`), except on columns where
    /// more than `bias` solutions disagree, which take the minority value instead.
    pub fn population(&self, bias: usize) -> Vec<u8> {
        let k = self.entries.len();
        self.column_counts()
            .map(|(ones, minority)| {
                let majority = u8::from(ones >= k / 2);
                if minority > bias { 1 - majority } else { majority }
            })
            .collect()
    }

    /// Hamming distance between entries `a` and `b`.
    pub fn hamming_distance(&self, a: usize, b: usize) -> usize {
        hamming_distance(&self.entries[a].solution, &self.entries[b].solution)
    }

    /// Returns statistics about the archive.
    pub fn stats(&self) -> ArchiveStats {
        if self.entries.is_empty() {
            return ArchiveStats {
                count: 0,
                best_energy: f64::NEG_INFINITY,
                worst_energy: f64::NEG_INFINITY,
                mean_energy: 0.0,
                mean_diversity: 0.0,
            };
        }

        let count = self.entries.len();
        let mean_energy = self.entries.iter().map(|e| e.energy).sum::<f64>() / count as f64;

        let mut total_diversity = 0usize;
        let mut pairs = 0usize;
        for i in 0..count {
            for j in (i + 1)..count {
                total_diversity += self.hamming_distance(i, j);
                pairs += 1;
            }
        }
        let mean_diversity = if pairs > 0 {
            total_diversity as f64 / pairs as f64
        } else {
            0.0
        };

        ArchiveStats {
            count,
            best_energy: self.entries[0].energy,
            worst_energy: self.entries[count - 1].energy,
            mean_energy,
            mean_diversity,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
