use std::collections::HashMap;
use std::error::Error;

use analysis::frame::Frame;
use lazy_static::lazy_static;

use crate::ir::{AnnotationMap, Annotations, Function, Unit};

pub mod const_analysis;
pub mod type_analysis;

pub trait Analysis: Sync {
    fn analyze(&self, function: &Function, unit: &Unit) -> Result<Annotations, String>;

    fn analyze_all(&self, unit: &Unit) -> Result<AnnotationMap, String> {
        let mut result = HashMap::new();
        for function in &unit.functions {
            result.insert(function.name, self.analyze(function, unit)?);
        }
        Ok(result)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Analyses {
    Type,
    Const,
}

lazy_static! {
    static ref ANALYSES: HashMap<Analyses, Box<dyn Analysis>> = {
        let mut m = HashMap::<Analyses, Box<dyn Analysis>>::new();
        m.insert(Analyses::Type, Box::new(type_analysis::TypeAnalysis));
        m.insert(Analyses::Const, Box::new(const_analysis::ConstAnalysis));
        m
    };
}

pub fn get_analysis_results(analysis: Analyses, unit: &Unit) -> Result<AnnotationMap, String> {
    let analysis = ANALYSES.get(&analysis).expect("Unimplemented analysis!");
    analysis.analyze_all(unit)
}

/// Render an error with its full cause chain on one line.
pub fn render_error(err: &dyn Error) -> String {
    let mut result = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        result.push_str(": ");
        result.push_str(&cause.to_string());
        current = cause.source();
    }
    result
}

/// Turn solved frames into listing annotations showing the abstract state
/// before each instruction.
pub fn annotate_frames<V>(
    frames: &[Option<Frame<V>>],
    mut render: impl FnMut(&V) -> String,
) -> Annotations {
    let mut anns = Annotations::default();
    for (pos, frame) in frames.iter().enumerate() {
        let Some(frame) = frame else {
            anns.0.insert(pos, "unreachable".to_owned());
            continue;
        };
        let list = |values: &[V], render: &mut dyn FnMut(&V) -> String| {
            values.iter().map(|v| render(v)).collect::<Vec<_>>().join(", ")
        };
        anns.0.insert(
            pos,
            format!(
                "locals: [{}], stack: [{}]",
                list(frame.locals(), &mut render),
                list(frame.stack(), &mut render)
            ),
        );
    }
    anns
}

#[cfg(test)]
mod type_analysis_tests;

#[cfg(test)]
mod const_analysis_tests;
