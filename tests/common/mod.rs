//! Shared fixtures: miniature dictionary trees written to disk.
//!
//! The production dictionaries are megabytes of lemmas; these cover just
//! enough vocabulary to exercise every pipeline stage — inflection
//! paradigms, shared lemmas, prefixes, several scripts and several
//! languages — while staying readable in a test failure.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

pub const RU_GRAMTAB: &str = "\
// ancode xcode part-of-speech grammems
Са Са С им,ед
Св Св С рд,ед
Сг Сг С вн,ед
Га Га Г буд,1л
";

/// Toy Russian: four paradigms.
///
/// - model 0 (`росси`): россия / россии / россию
/// - model 1 (`квартир`): квартира / квартиры / квартиру
/// - model 2 (`прод`): продать / продам / продажа / продажи — one lemma
///   covering both the verb and the noun forms, which is what lets
///   "продажа квартиры" find "продам квартиру"
/// - model 3 (`президент`, `путин`): zero-flexion lemma / -у / -а
pub const RU_MRD: &str = "\
4
я*Са%и*Св%ю*Сг
а*Са%ы*Св%у*Сг
ать*Га%ам*Га%ажа*Са%ажи*Св
*Са%у*Сг%а*Св
0
0
1
супер
5
росси 0 0 - Са -
квартир 1 0 - Са -
прод 2 0 - Га -
президент 3 0 - Са -
путин 3 0 - Са -
";

pub const EN_GRAMTAB: &str = "\
Na Na N sg
Np Np N pl
";

pub const EN_MRD: &str = "\
1
*Na%s*Np
0
0
1
un
2
new 0 0 - Na -
old 0 0 - Na -
";

/// Languages "aa" and "bb" share the surface form "torx" but disagree on
/// its lemma: in "aa" it inflects from "tor", in "bb" it is a lemma of
/// its own. Forcing one or the other changes what a query matches.
pub const AA_MRD: &str = "\
1
*Na%x*Np
0
0
1
un
1
tor 0 0 - Na -
";

pub const BB_MRD: &str = "\
1
*Na
0
0
1
un
1
torx 0 0 - Na -
";

pub fn write_dictionary(root: &Path, folder: &str, gramtab: &str, mrd: &str) {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("gramtab.tab"), gramtab).unwrap();
    fs::write(dir.join("morphs.mrd"), mrd).unwrap();
}

/// A root with the full four-language zoo: 01ru, 02en, 03aa, 04bb.
pub fn dictionary_root() -> TempDir {
    let root = TempDir::new().unwrap();
    write_dictionary(root.path(), "01ru", RU_GRAMTAB, RU_MRD);
    write_dictionary(root.path(), "02en", EN_GRAMTAB, EN_MRD);
    write_dictionary(root.path(), "03aa", EN_GRAMTAB, AA_MRD);
    write_dictionary(root.path(), "04bb", EN_GRAMTAB, BB_MRD);
    root
}
