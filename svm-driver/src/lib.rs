use clap::{Parser as CommandLineParser, ValueEnum};
use svm_lib::{
    analysis::{Analyses, get_analysis_results},
    ir,
    lexer::Lexer,
    parser::Parser,
};
use std::collections::HashMap;
use utils::DiagnosticEmitter;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum CLIAnalyses {
    Type,
    Const,
}

impl From<CLIAnalyses> for Analyses {
    fn from(value: CLIAnalyses) -> Self {
        match value {
            CLIAnalyses::Type => Analyses::Type,
            CLIAnalyses::Const => Analyses::Const,
        }
    }
}

#[derive(Debug, CommandLineParser, Default)]
#[command(name = "svm", version, about = "Assemble and analyze SVM methods.")]
pub struct Opt {
    /// Print the instruction listing of the parsed unit.
    #[arg(long)]
    pub dump: bool,

    /// Name of the analysis to execute.
    #[arg(long, value_name = "ANALYSIS_NAME")]
    pub analyze: Option<CLIAnalyses>,

    /// File containing the methods to process.
    pub filename: String,
}

pub fn process_source(src: &str, diag: &mut DiagnosticEmitter, opts: &Opt) -> Option<()> {
    let lexer = Lexer::new(src, diag);
    let tokens = lexer.lex_all();
    if tokens.tokens.is_empty() {
        return None;
    }
    let parser = Parser::new(tokens, diag);
    let unit = parser.parse()?;

    if opts.dump {
        diag.out(&ir::print(&unit, &HashMap::new()));
    }

    if let Some(analysis) = opts.analyze {
        match get_analysis_results(analysis.into(), &unit) {
            Ok(anns) => diag.out(&ir::print(&unit, &anns)),
            Err(message) => {
                diag.err_ln(&message);
                return None;
            }
        }
    }

    Some(())
}
