//! Loader for the textual dictionary format: `morphs.mrd` + `gramtab.tab`.
//!
//! `morphs.mrd` is line-oriented UTF-8 with size-prefixed sections in
//! fixed order: flex models, accent models (skipped), user sessions
//! (skipped), prefix models, lemmas. `gramtab.tab` maps ancodes to
//! grammatical descriptions. Flexions, prefixes and stems are lowercased
//! on load; ancodes stay verbatim. The format belongs to the dictionary
//! compilers, so the parser reports malformed lines instead of guessing.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use ahash::AHashMap;

use crate::automaton::invalid_data;
use crate::error::MorphError;

pub const MRD_FILE_NAME: &str = "morphs.mrd";
pub const GRAMTAB_FILE_NAME: &str = "gramtab.tab";
pub const AUTOMATON_FILE_NAME: &str = "automat.save";

/// One grammatical feature bundle, keyed by its ancode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    pub ancode: String,
    pub part_of_speech: String,
    pub grammems: Option<String>,
}

/// A single suffix-inflection rule inside a flex model.
#[derive(Debug, Clone)]
pub struct FlexVariance {
    pub form_no: u16,
    pub flexion: Option<String>,
    pub ancode: String,
    /// Index into [`MorphologyBase::grammars`], when the ancode is known.
    pub grammar: Option<usize>,
    pub prefix: Option<String>,
}

impl FlexVariance {
    pub fn flexion_chars(&self) -> usize {
        self.flexion.as_deref().map_or(0, |f| f.chars().count())
    }
}

/// A paradigm: ordered variances, index 0 being the lemma variance.
pub type FlexModel = Vec<FlexVariance>;

/// Extra prefixes attachable to a lemma ("quasi", "ultra", …).
pub type PrefixModel = Vec<String>;

/// One dictionary lemma: invariant stem plus model references.
#[derive(Debug, Clone)]
pub struct Lemma {
    /// Empty-base lemmas (`#` in the source) carry `None`.
    pub base: Option<String>,
    pub flex_model_no: usize,
    pub ancode: Option<String>,
    pub prefix_set_no: Option<usize>,
}

/// The loaded rule base of one language.
#[derive(Debug)]
pub struct MorphologyBase {
    pub grammars: Vec<Grammar>,
    grammar_index: AHashMap<String, usize>,
    pub flex_models: Vec<FlexModel>,
    pub prefix_models: Vec<PrefixModel>,
    /// Union of all prefix-model entries in wide form, sorted by code
    /// point, for the known-prefix decomposition check.
    pub all_prefixes: Vec<Vec<char>>,
    /// Loaded only for automaton training; runtime analysis never needs
    /// the lemma list.
    pub lemmas: Option<Vec<Lemma>>,
}

impl MorphologyBase {
    pub fn grammar_by_ancode(&self, ancode: &str) -> Option<usize> {
        self.grammar_index.get(ancode).copied()
    }

    /// Load a rule base from the two dictionary files. `load_lemmas`
    /// pulls in the lemma section, needed only when (re)building the
    /// analysis automaton.
    pub fn from_files(
        mrd_path: &Path,
        gramtab_path: &Path,
        load_lemmas: bool,
    ) -> Result<Self, MorphError> {
        let gramtab = File::open(gramtab_path).map_err(MorphError::Io)?;
        let (grammars, grammar_index) =
            load_grammars(&mut BufReader::new(gramtab)).map_err(|e| wrap(gramtab_path, e))?;
        let mrd = File::open(mrd_path).map_err(MorphError::Io)?;
        Self::load_mrd(
            &mut BufReader::new(mrd),
            grammars,
            grammar_index,
            load_lemmas,
        )
        .map_err(|e| wrap(mrd_path, e))
    }

    fn load_mrd<R: BufRead>(
        reader: &mut R,
        grammars: Vec<Grammar>,
        grammar_index: AHashMap<String, usize>,
        load_lemmas: bool,
    ) -> io::Result<Self> {
        let flex_models = load_flex_models(reader, &grammar_index)?;
        skip_section(reader)?; // accent models
        skip_section(reader)?; // user sessions
        let prefix_models = load_prefix_models(reader)?;
        let lemmas = if load_lemmas {
            Some(load_lemmas_section(
                reader,
                flex_models.len(),
                prefix_models.len(),
            )?)
        } else {
            None
        };
        let all_prefixes = flatten_prefixes(&prefix_models);
        Ok(Self {
            grammars,
            grammar_index,
            flex_models,
            prefix_models,
            all_prefixes,
            lemmas,
        })
    }
}

fn wrap(path: &Path, error: io::Error) -> MorphError {
    if error.kind() == io::ErrorKind::InvalidData {
        MorphError::MalformedDictionary {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    } else {
        MorphError::Io(error)
    }
}

/// Read one line, stripped of surrounding whitespace. `None` at EOF.
fn next_line<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(crate::text::strip_line(&line).to_string()))
}

fn section_size<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    match next_line(reader)? {
        Some(line) => line
            .parse::<usize>()
            .map_err(|_| invalid_data(format!("bad section size line: '{line}'"))),
        None => Err(invalid_data("missing section size line".to_string())),
    }
}

fn skip_section<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let size = section_size(reader)?;
    for index in 0..size {
        if next_line(reader)?.is_none() {
            return Err(invalid_data(format!(
                "section ended after {index} of {size} lines"
            )));
        }
    }
    Ok(())
}

/// Run `parse` over every line of one size-prefixed section.
fn load_section<R: BufRead, T>(
    reader: &mut R,
    mut parse: impl FnMut(&str) -> io::Result<T>,
) -> io::Result<Vec<T>> {
    let size = section_size(reader)?;
    let mut items = Vec::with_capacity(size);
    for index in 0..size {
        match next_line(reader)? {
            Some(line) => items.push(parse(&line)?),
            None => {
                return Err(invalid_data(format!(
                    "section ended after {index} of {size} lines"
                )))
            }
        }
    }
    Ok(items)
}

fn load_grammars<R: BufRead>(
    reader: &mut R,
) -> io::Result<(Vec<Grammar>, AHashMap<String, usize>)> {
    let mut grammars = Vec::new();
    let mut index = AHashMap::new();
    while let Some(line) = next_line(reader)? {
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let mut fields = line.split_whitespace();
        let ancode = fields
            .next()
            .ok_or_else(|| invalid_data(format!("grammar line without ancode: '{line}'")))?;
        let _xcode = fields.next();
        let part_of_speech = fields
            .next()
            .ok_or_else(|| invalid_data(format!("grammar line without part of speech: '{line}'")))?;
        let grammems = fields.next().map(str::to_string);
        // First record per ancode wins.
        if !index.contains_key(ancode) {
            index.insert(ancode.to_string(), grammars.len());
            grammars.push(Grammar {
                ancode: ancode.to_string(),
                part_of_speech: part_of_speech.to_string(),
                grammems,
            });
        }
    }
    Ok((grammars, index))
}

fn parse_flex_model(line: &str, grammar_index: &AHashMap<String, usize>) -> io::Result<FlexModel> {
    let mut model = Vec::new();
    for chunk in line.split('%').filter(|chunk| !chunk.is_empty()) {
        // `q//q` starts a trailing comment inside a variance.
        let body = chunk.split("q//q").next().unwrap_or(chunk).trim_end();
        let star = body
            .find('*')
            .ok_or_else(|| invalid_data(format!("variance without '*': '{body}'")))?;
        let flexion = (star > 0).then(|| body[..star].to_lowercase());
        let rest = &body[star + 1..];
        let (ancode, prefix) = match rest.find('*') {
            Some(at) => (&rest[..at], Some(rest[at + 1..].to_lowercase())),
            None => (rest, None),
        };
        model.push(FlexVariance {
            form_no: model.len() as u16,
            flexion,
            grammar: grammar_index.get(ancode).copied(),
            ancode: ancode.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()),
        });
    }
    Ok(model)
}

fn load_flex_models<R: BufRead>(
    reader: &mut R,
    grammar_index: &AHashMap<String, usize>,
) -> io::Result<Vec<FlexModel>> {
    load_section(reader, |line| parse_flex_model(line, grammar_index))
}

fn load_prefix_models<R: BufRead>(reader: &mut R) -> io::Result<Vec<PrefixModel>> {
    load_section(reader, |line| {
        Ok(line
            .split([',', ' '])
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_lowercase)
            .collect())
    })
}

fn parse_lemma(line: &str, flex_models: usize, prefix_models: usize) -> io::Result<Lemma> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(invalid_data(format!(
            "lemma line with {} fields instead of 6: '{line}'",
            fields.len()
        )));
    }
    let base = (fields[0] != "#").then(|| fields[0].to_lowercase());
    let flex_model_no: usize = fields[1]
        .parse()
        .map_err(|_| invalid_data(format!("bad flex model number: '{}'", fields[1])))?;
    if flex_model_no >= flex_models {
        return Err(invalid_data(format!(
            "lemma references flex model {flex_model_no} of {flex_models}"
        )));
    }
    // fields[2] is the accent model, fields[3] the user session: unused.
    let ancode = (fields[4] != "-").then(|| fields[4].to_string());
    let prefix_set_no = if fields[5] == "-" {
        None
    } else {
        let no: usize = fields[5]
            .parse()
            .map_err(|_| invalid_data(format!("bad prefix set number: '{}'", fields[5])))?;
        if no >= prefix_models {
            return Err(invalid_data(format!(
                "lemma references prefix model {no} of {prefix_models}"
            )));
        }
        Some(no)
    };
    Ok(Lemma {
        base,
        flex_model_no,
        ancode,
        prefix_set_no,
    })
}

fn load_lemmas_section<R: BufRead>(
    reader: &mut R,
    flex_models: usize,
    prefix_models: usize,
) -> io::Result<Vec<Lemma>> {
    load_section(reader, |line| parse_lemma(line, flex_models, prefix_models))
}

fn flatten_prefixes(models: &[PrefixModel]) -> Vec<Vec<char>> {
    let mut all: Vec<Vec<char>> = models
        .iter()
        .flat_map(|model| model.iter().map(|prefix| prefix.chars().collect()))
        .collect();
    all.sort_unstable();
    all
}
