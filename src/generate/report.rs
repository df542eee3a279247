//! Generation run report.
//!
//! Summarizes what a run produced. Rendered as text (Display) or serialized
//! as JSON for scripting.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::composite::PlacedObject;
use crate::ir::ClassId;
use crate::photometric::PhotometricMode;

/// Counts accumulated over a generation run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GenerateReport {
    /// Number of examples written.
    pub examples: usize,
    /// Number of examples with no objects placed.
    pub empty_examples: usize,
    /// Total number of objects placed across all examples.
    pub objects_placed: usize,
    /// Objects placed per class, sorted by class id.
    pub per_class: Vec<ClassCount>,
    /// How many objects took each photometric branch.
    pub modes: ModeCounts,
    /// Augmented copies written alongside the examples.
    pub variants: usize,
    /// Boxes dropped from augmented copies because they left the image.
    pub dropped_boxes: usize,
    /// Master seed of the run, if one was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Where the examples were written, if they went to disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

/// Number of objects placed for one class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class_id: ClassId,
    pub count: usize,
}

/// Photometric branch counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ModeCounts {
    pub linear: usize,
    pub gamma: usize,
}

/// Per-example trace reduced to what the report needs.
#[derive(Clone, Debug, Default)]
pub(crate) struct ExampleSummary {
    pub classes: Vec<ClassId>,
    pub modes: Vec<PhotometricMode>,
    pub variants: usize,
    pub dropped_boxes: usize,
}

impl ExampleSummary {
    pub(crate) fn from_placed(placed: &[PlacedObject]) -> Self {
        Self {
            classes: placed.iter().map(|p| p.annotation.class_id).collect(),
            modes: placed.iter().map(|p| p.mode).collect(),
            ..Default::default()
        }
    }
}

impl GenerateReport {
    pub(crate) fn from_summaries(summaries: &[ExampleSummary], seed: Option<u64>) -> Self {
        let mut per_class: BTreeMap<ClassId, usize> = BTreeMap::new();
        let mut modes = ModeCounts::default();
        let mut objects_placed = 0;
        let mut empty_examples = 0;
        let mut variants = 0;
        let mut dropped_boxes = 0;

        for summary in summaries {
            if summary.classes.is_empty() {
                empty_examples += 1;
            }
            objects_placed += summary.classes.len();
            variants += summary.variants;
            dropped_boxes += summary.dropped_boxes;
            for class_id in &summary.classes {
                *per_class.entry(*class_id).or_insert(0) += 1;
            }
            for mode in &summary.modes {
                match mode {
                    PhotometricMode::Linear => modes.linear += 1,
                    PhotometricMode::Gamma => modes.gamma += 1,
                }
            }
        }

        Self {
            examples: summaries.len(),
            empty_examples,
            objects_placed,
            per_class: per_class
                .into_iter()
                .map(|(class_id, count)| ClassCount { class_id, count })
                .collect(),
            modes,
            variants,
            dropped_boxes,
            seed,
            output_dir: None,
        }
    }

    /// Average number of objects per example (0 for an empty run).
    pub fn mean_objects_per_example(&self) -> f64 {
        if self.examples == 0 {
            0.0
        } else {
            self.objects_placed as f64 / self.examples as f64
        }
    }
}

impl fmt::Display for GenerateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Generated {} example(s) with {} object(s) ({:.2} per example, {} empty)",
            self.examples,
            self.objects_placed,
            self.mean_objects_per_example(),
            self.empty_examples
        )?;

        if let Some(dir) = &self.output_dir {
            writeln!(f, "  output: {}", dir)?;
        }
        if let Some(seed) = self.seed {
            writeln!(f, "  seed: {}", seed)?;
        }
        if self.variants > 0 {
            writeln!(
                f,
                "  augmented: {} variant(s), {} box(es) dropped",
                self.variants, self.dropped_boxes
            )?;
        }

        if self.objects_placed > 0 {
            writeln!(
                f,
                "  photometric: {} linear, {} gamma",
                self.modes.linear, self.modes.gamma
            )?;
            writeln!(f)?;
            writeln!(f, "Objects per class:")?;
            for entry in &self.per_class {
                writeln!(f, "  {:>4}  {}", entry.class_id, entry.count)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_aggregates_summaries() {
        let summaries = vec![
            ExampleSummary {
                classes: vec![ClassId(2), ClassId(0)],
                modes: vec![PhotometricMode::Linear, PhotometricMode::Gamma],
                variants: 4,
                dropped_boxes: 1,
            },
            ExampleSummary::default(),
            ExampleSummary {
                classes: vec![ClassId(2)],
                modes: vec![PhotometricMode::Gamma],
                variants: 4,
                dropped_boxes: 0,
            },
        ];

        let report = GenerateReport::from_summaries(&summaries, Some(9));
        assert_eq!(report.examples, 3);
        assert_eq!(report.empty_examples, 1);
        assert_eq!(report.objects_placed, 3);
        assert_eq!(
            report.per_class,
            vec![
                ClassCount {
                    class_id: ClassId(0),
                    count: 1
                },
                ClassCount {
                    class_id: ClassId(2),
                    count: 2
                },
            ]
        );
        assert_eq!(report.modes, ModeCounts { linear: 1, gamma: 2 });
        assert!((report.mean_objects_per_example() - 1.0).abs() < 1e-12);
        assert_eq!(report.variants, 8);
        assert_eq!(report.dropped_boxes, 1);
        assert!(report
            .to_string()
            .contains("augmented: 8 variant(s), 1 box(es) dropped"));
    }

    #[test]
    fn report_text_mentions_counts() {
        let report = GenerateReport::from_summaries(
            &[ExampleSummary {
                classes: vec![ClassId(1)],
                modes: vec![PhotometricMode::Linear],
                ..Default::default()
            }],
            None,
        );
        let text = report.to_string();
        assert!(text.contains("Generated 1 example(s) with 1 object(s)"));
        assert!(text.contains("1 linear, 0 gamma"));
        assert!(!text.contains("augmented"));
    }

    #[test]
    fn report_serializes_without_empty_options() {
        let report = GenerateReport::from_summaries(&[], None);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"examples\":0"));
        assert!(!json.contains("seed"));
        assert!(!json.contains("output_dir"));
    }
}
