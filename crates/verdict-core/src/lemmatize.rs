//! Verb lemmatization.
//!
//! Dictionary + rule morphology in the WordNet style: irregular forms are
//! looked up in an exception table, everything else goes through suffix
//! substitution and is accepted only if the candidate is a known verb. The
//! shortest accepted candidate wins; tokens with no known verb form come back
//! unchanged.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Suffix substitutions for verbs, tried in order.
const VERB_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("s", ""),
    ("ies", "y"),
    ("es", "e"),
    ("es", ""),
    ("ed", "e"),
    ("ed", ""),
    ("ing", "e"),
    ("ing", ""),
];

/// Base forms of verbs known to the built-in lexicon.
const VERB_LEXICON: &[&str] = &[
    "abandon", "abate", "abide", "abolish", "abridge", "abscond", "absolve", "abstain",
    "abuse", "accede", "accept", "access", "accompany", "accord", "account", "accrue",
    "accuse", "achieve", "acknowledge", "acquire", "acquit", "act", "add", "address",
    "adhere", "adjourn", "adjudge", "adjudicate", "adjust", "administer", "admit", "adopt",
    "advance", "advise", "advocate", "affect", "affirm", "afford", "agree", "aid", "alert",
    "allege", "allocate", "allot", "allow", "alter", "amend", "amount", "analyse", "analyze",
    "announce", "annul", "answer", "anticipate", "appeal", "appear", "append", "apply",
    "appoint", "apportion", "appraise", "appreciate", "apprehend", "approach", "approve",
    "argue", "arise", "arrange", "arrest", "arrive", "ask", "assault", "assert", "assess",
    "assign", "assist", "associate", "assume", "assure", "attach", "attack", "attempt",
    "attend", "attest", "attribute", "audit", "authorise", "authorize", "avoid", "await",
    "award", "bar", "bargain", "base", "be", "bear", "become", "begin", "behave", "believe",
    "belong", "benefit", "bequeath", "bind", "blame", "borrow", "breach", "break", "bribe",
    "bring", "build", "burden", "buy", "calculate", "call", "cancel", "care", "carry",
    "case", "cause", "cease", "certify", "challenge", "change", "charge", "check", "choose",
    "cite", "claim", "clarify", "classify", "clear", "close", "coerce", "collect", "come",
    "commence", "comment", "commit", "communicate", "compare", "compel", "compensate",
    "complain", "complete", "comply", "compose", "comprise", "compromise", "compute",
    "conceal", "concede", "conceive", "concern", "conclude", "concur", "condemn",
    "condition", "conduct", "confer", "confess", "confirm", "confiscate", "conflict",
    "confront", "connect", "consent", "consider", "consist", "constitute", "construct",
    "construe", "consult", "contain", "contemplate", "contend", "contest", "continue",
    "contract", "contradict", "contravene", "contribute", "control", "convene", "convert",
    "convey", "convict", "convince", "cooperate", "copy", "correct", "corroborate", "cost",
    "counsel", "count", "court", "cover", "create", "credit", "cross", "cure", "damage",
    "deal", "debate", "decide", "declare", "decline", "decree", "deem", "default", "defeat",
    "defend", "defer", "define", "defraud", "delay", "delegate", "delete", "deliberate",
    "deliver", "demand", "demonstrate", "deny", "depart", "depend", "depose", "deposit",
    "deprive", "derive", "describe", "deserve", "designate", "desire", "destroy", "detain",
    "detect", "determine", "develop", "deviate", "devise", "die", "differ", "direct",
    "disagree", "disallow", "discharge", "disclose", "discontinue", "discover", "discuss",
    "dismiss", "dispense", "dispose", "dispute", "disqualify", "disregard", "dissent",
    "dissolve", "distinguish", "distribute", "divert", "divide", "divorce", "do", "document",
    "draft", "draw", "drive", "drop", "earn", "effect", "elect", "emerge", "employ", "enable",
    "enact", "encourage", "end", "endorse", "enforce", "engage", "enjoin", "enjoy", "ensure",
    "enter", "entitle", "equate", "erect", "err", "escape", "establish", "estimate",
    "evaluate", "evict", "evidence", "examine", "exceed", "except", "exchange", "exclude",
    "excuse", "execute", "exempt", "exercise", "exhibit", "exist", "expect", "expedite",
    "expel", "expend", "experience", "expire", "explain", "exploit", "expose", "express",
    "extend", "extort", "face", "facilitate", "fail", "fall", "favour", "favor", "fear",
    "feel", "fight", "file", "fill", "finalise", "finalize", "finance", "find", "fine",
    "finish", "fix", "follow", "forbid", "force", "foreclose", "forfeit", "forge", "form",
    "formulate", "forward", "found", "frame", "fund", "gain", "garnish", "gather", "get",
    "give", "go", "govern", "grant", "guarantee", "guard", "handle", "happen", "harass",
    "harm", "have", "hear", "help", "hold", "hope", "identify", "ignore", "illustrate",
    "impeach", "implement", "imply", "import", "impose", "imprison", "improve", "incite",
    "include", "incorporate", "increase", "incur", "indemnify", "indicate", "indict",
    "induce", "infer", "inform", "infringe", "inherit", "injure", "inquire", "insist",
    "inspect", "instruct", "insure", "intend", "interfere", "interpret", "interrogate",
    "intervene", "interview", "introduce", "invalidate", "invest", "investigate", "invite",
    "invoke", "involve", "issue", "join", "judge", "justify", "keep", "kill", "know",
    "label", "lack", "land", "last", "launch", "lay", "lead", "learn", "lease", "leave",
    "legislate", "lend", "let", "levy", "license", "lie", "limit", "list", "litigate",
    "live", "lodge", "look", "lose", "maintain", "make", "manage", "mandate", "mark",
    "marry", "matter", "mean", "measure", "mediate", "meet", "mention", "merge", "mislead",
    "misrepresent", "mitigate", "modify", "monitor", "mortgage", "move", "name", "need",
    "negate", "neglect", "negotiate", "nominate", "note", "notice", "notify", "nullify",
    "object", "oblige", "observe", "obstruct", "obtain", "occupy", "occur", "offend",
    "offer", "omit", "open", "operate", "oppose", "order", "overrule", "overturn", "owe",
    "own", "pardon", "participate", "pass", "pay", "penalise", "penalize", "perform",
    "permit", "persuade", "pertain", "petition", "place", "plan", "plead", "pledge",
    "point", "possess", "post", "postpone", "practise", "practice", "precede", "preclude",
    "prefer", "prejudice", "prepare", "prescribe", "present", "preserve", "preside",
    "press", "presume", "prevail", "prevent", "proceed", "process", "procure", "produce",
    "prohibit", "promise", "promote", "pronounce", "propose", "prosecute", "protect",
    "prove", "provide", "publish", "punish", "purchase", "pursue", "put", "qualify",
    "quash", "question", "quote", "raise", "ratify", "reach", "read", "realise", "realize",
    "reason", "rebut", "recall", "receive", "recognise", "recognize", "recommend",
    "reconsider", "record", "recover", "rectify", "recuse", "reduce", "refer", "reflect",
    "refund", "refuse", "regard", "register", "regulate", "reinstate", "reject", "relate",
    "release", "relieve", "rely", "remain", "remand", "remedy", "remit", "remove",
    "render", "renew", "repay", "repeal", "repeat", "replace", "reply", "report",
    "represent", "request", "require", "rescind", "reserve", "reside", "resign", "resist",
    "resolve", "respond", "rest", "restore", "restrain", "restrict", "result", "resume",
    "retain", "retire", "return", "reveal", "reverse", "review", "revise", "revoke",
    "reward", "rule", "run", "satisfy", "say", "secure", "see", "seek", "seem", "seize",
    "sell", "send", "sentence", "separate", "serve", "set", "settle", "share", "show",
    "sign", "signify", "sit", "solve", "specify", "speak", "stand", "start", "state",
    "stay", "steal", "stipulate", "stop", "strike", "study", "sublet", "submit",
    "subpoena", "succeed", "sue", "suffer", "suggest", "summarise", "summarize", "summon",
    "supply", "support", "suppose", "suppress", "surrender", "suspend", "sustain", "swear",
    "take", "tell", "tend", "terminate", "testify", "think", "threaten", "transfer",
    "treat", "trespass", "try", "turn", "uncover", "undergo", "underlie", "undermine",
    "understand", "undertake", "uphold", "urge", "use", "vacate", "validate", "value",
    "vary", "verify", "vest", "veto", "violate", "void", "waive", "want", "warn", "warrant",
    "weigh", "withdraw", "withhold", "witness", "work", "write", "wrong",
];

/// Irregular inflections mapped to their base form.
const VERB_EXCEPTIONS: &[(&str, &str)] = &[
    ("abode", "abide"),
    ("acquitted", "acquit"),
    ("acquitting", "acquit"),
    ("admitted", "admit"),
    ("admitting", "admit"),
    ("allotted", "allot"),
    ("allotting", "allot"),
    ("am", "be"),
    ("annulled", "annul"),
    ("annulling", "annul"),
    ("applied", "apply"),
    ("are", "be"),
    ("arose", "arise"),
    ("arisen", "arise"),
    ("barred", "bar"),
    ("barring", "bar"),
    ("became", "become"),
    ("began", "begin"),
    ("begun", "begin"),
    ("beginning", "begin"),
    ("bore", "bear"),
    ("borne", "bear"),
    ("been", "be"),
    ("bound", "bind"),
    ("broke", "break"),
    ("broken", "break"),
    ("brought", "bring"),
    ("built", "build"),
    ("bought", "buy"),
    ("cancelled", "cancel"),
    ("cancelling", "cancel"),
    ("came", "come"),
    ("carried", "carry"),
    ("certified", "certify"),
    ("chose", "choose"),
    ("chosen", "choose"),
    ("clarified", "clarify"),
    ("classified", "classify"),
    ("committed", "commit"),
    ("committing", "commit"),
    ("compelled", "compel"),
    ("compelling", "compel"),
    ("complied", "comply"),
    ("concurred", "concur"),
    ("concurring", "concur"),
    ("conferred", "confer"),
    ("conferring", "confer"),
    ("controlled", "control"),
    ("controlling", "control"),
    ("copied", "copy"),
    ("counselled", "counsel"),
    ("counselling", "counsel"),
    ("dealt", "deal"),
    ("deferred", "defer"),
    ("deferring", "defer"),
    ("denied", "deny"),
    ("did", "do"),
    ("died", "die"),
    ("dying", "die"),
    ("disqualified", "disqualify"),
    ("done", "do"),
    ("dropped", "drop"),
    ("dropping", "drop"),
    ("drew", "draw"),
    ("drawn", "draw"),
    ("drove", "drive"),
    ("driven", "drive"),
    ("erred", "err"),
    ("erring", "err"),
    ("expelled", "expel"),
    ("expelling", "expel"),
    ("fell", "fall"),
    ("fallen", "fall"),
    ("felt", "feel"),
    ("fought", "fight"),
    ("forbade", "forbid"),
    ("forbidden", "forbid"),
    ("forbidding", "forbid"),
    ("found", "find"),
    ("gave", "give"),
    ("given", "give"),
    ("went", "go"),
    ("gone", "go"),
    ("got", "get"),
    ("gotten", "get"),
    ("getting", "get"),
    ("had", "have"),
    ("has", "have"),
    ("heard", "hear"),
    ("held", "hold"),
    ("identified", "identify"),
    ("implied", "imply"),
    ("incurred", "incur"),
    ("incurring", "incur"),
    ("indemnified", "indemnify"),
    ("inferred", "infer"),
    ("inferring", "infer"),
    ("is", "be"),
    ("justified", "justify"),
    ("kept", "keep"),
    ("knew", "know"),
    ("known", "know"),
    ("labelled", "label"),
    ("labelling", "label"),
    ("laid", "lay"),
    ("lain", "lie"),
    ("lay", "lie"),
    ("lying", "lie"),
    ("led", "lead"),
    ("left", "leave"),
    ("lent", "lend"),
    ("letting", "let"),
    ("levied", "levy"),
    ("lost", "lose"),
    ("made", "make"),
    ("married", "marry"),
    ("meant", "mean"),
    ("met", "meet"),
    ("misled", "mislead"),
    ("modified", "modify"),
    ("notified", "notify"),
    ("nullified", "nullify"),
    ("occupied", "occupy"),
    ("occurred", "occur"),
    ("occurring", "occur"),
    ("omitted", "omit"),
    ("omitting", "omit"),
    ("paid", "pay"),
    ("permitted", "permit"),
    ("permitting", "permit"),
    ("planned", "plan"),
    ("planning", "plan"),
    ("pled", "plead"),
    ("preferred", "prefer"),
    ("preferring", "prefer"),
    ("putting", "put"),
    ("qualified", "qualify"),
    ("ran", "run"),
    ("running", "run"),
    ("ratified", "ratify"),
    ("rebutted", "rebut"),
    ("rebutting", "rebut"),
    ("rectified", "rectify"),
    ("referred", "refer"),
    ("referring", "refer"),
    ("relied", "rely"),
    ("remedied", "remedy"),
    ("remitted", "remit"),
    ("remitting", "remit"),
    ("repaid", "repay"),
    ("replied", "reply"),
    ("said", "say"),
    ("sat", "sit"),
    ("sitting", "sit"),
    ("satisfied", "satisfy"),
    ("saw", "see"),
    ("seen", "see"),
    ("sought", "seek"),
    ("sold", "sell"),
    ("sent", "send"),
    ("setting", "set"),
    ("shown", "show"),
    ("signified", "signify"),
    ("spoke", "speak"),
    ("spoken", "speak"),
    ("specified", "specify"),
    ("stood", "stand"),
    ("stole", "steal"),
    ("stolen", "steal"),
    ("stopped", "stop"),
    ("stopping", "stop"),
    ("struck", "strike"),
    ("stricken", "strike"),
    ("studied", "study"),
    ("subletting", "sublet"),
    ("submitted", "submit"),
    ("submitting", "submit"),
    ("supplied", "supply"),
    ("swore", "swear"),
    ("sworn", "swear"),
    ("took", "take"),
    ("taken", "take"),
    ("told", "tell"),
    ("testified", "testify"),
    ("thought", "think"),
    ("transferred", "transfer"),
    ("transferring", "transfer"),
    ("tried", "try"),
    ("underwent", "undergo"),
    ("undergone", "undergo"),
    ("understood", "understand"),
    ("undertook", "undertake"),
    ("undertaken", "undertake"),
    ("upheld", "uphold"),
    ("varied", "vary"),
    ("verified", "verify"),
    ("vetoed", "veto"),
    ("was", "be"),
    ("were", "be"),
    ("withdrew", "withdraw"),
    ("withdrawn", "withdraw"),
    ("withheld", "withhold"),
    ("wrote", "write"),
    ("written", "write"),
];

/// Reduces tokens to their base verb form.
///
/// Build one per pipeline run and share it by reference.
#[derive(Debug, Clone)]
pub struct Lemmatizer {
    lexicon: HashSet<String>,
    exceptions: HashMap<String, Vec<String>>,
}

impl Default for Lemmatizer {
    fn default() -> Self {
        Self::english()
    }
}

impl Lemmatizer {
    /// Lemmatizer over the built-in English verb lexicon.
    pub fn english() -> Self {
        let mut lem = Self {
            lexicon: VERB_LEXICON.iter().map(|v| v.to_string()).collect(),
            exceptions: HashMap::new(),
        };
        for (form, lemma) in VERB_EXCEPTIONS {
            lem.add_exception(form, lemma);
        }
        lem
    }

    pub fn add_verb(&mut self, verb: &str) {
        self.lexicon.insert(verb.to_lowercase());
    }

    /// Register an irregular form. The lemma is added to the lexicon.
    pub fn add_exception(&mut self, form: &str, lemma: &str) {
        let lemma = lemma.to_lowercase();
        self.lexicon.insert(lemma.clone());
        let targets = self.exceptions.entry(form.to_lowercase()).or_default();
        if !targets.contains(&lemma) {
            targets.push(lemma);
        }
    }

    /// Extend the lexicon from a text file. Each non-empty, non-`#` line is
    /// either a base verb or `inflected<TAB>lemma`.
    pub fn extend_from_file(&mut self, path: &Path) -> CoreResult<usize> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut added = 0;
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('\t') {
                Some((form, lemma)) => self.add_exception(form.trim(), lemma.trim()),
                None => self.add_verb(line),
            }
            added += 1;
        }
        debug!(path = %path.display(), entries = added, "extended verb lexicon");
        Ok(added)
    }

    pub fn is_verb(&self, word: &str) -> bool {
        self.lexicon.contains(word)
    }

    pub fn lexicon_len(&self) -> usize {
        self.lexicon.len()
    }

    /// Base verb form of `word`, or `word` itself when none is known.
    pub fn lemmatize(&self, word: &str) -> String {
        let candidates: Vec<String> = match self.exceptions.get(word) {
            Some(targets) => std::iter::once(word.to_string())
                .chain(targets.iter().cloned())
                .collect(),
            None => std::iter::once(word.to_string())
                .chain(apply_rules(word))
                .collect(),
        };

        let mut best: Option<String> = None;
        for candidate in candidates {
            if !self.is_verb(&candidate) {
                continue;
            }
            let shorter = best
                .as_ref()
                .map_or(true, |b| candidate.chars().count() < b.chars().count());
            if shorter {
                best = Some(candidate);
            }
        }
        best.unwrap_or_else(|| word.to_string())
    }

    pub fn lemmatize_all(&self, tokens: &[String]) -> Vec<String> {
        tokens.iter().map(|t| self.lemmatize(t)).collect()
    }
}

fn apply_rules(word: &str) -> Vec<String> {
    VERB_SUBSTITUTIONS
        .iter()
        .filter_map(|(old, new)| word.strip_suffix(*old).map(|stem| format!("{stem}{new}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_inflections() {
        let lem = Lemmatizer::english();
        assert_eq!(lem.lemmatize("ruled"), "rule");
        assert_eq!(lem.lemmatize("hearing"), "hear");
        assert_eq!(lem.lemmatize("claims"), "claim");
        assert_eq!(lem.lemmatize("agreed"), "agree");
        assert_eq!(lem.lemmatize("taking"), "take");
        assert_eq!(lem.lemmatize("goes"), "go");
    }

    #[test]
    fn irregular_forms_use_exceptions() {
        let lem = Lemmatizer::english();
        assert_eq!(lem.lemmatize("applied"), "apply");
        assert_eq!(lem.lemmatize("held"), "hold");
        assert_eq!(lem.lemmatize("left"), "leave");
        assert_eq!(lem.lemmatize("found"), "find");
    }

    #[test]
    fn non_verbs_pass_through() {
        let lem = Lemmatizer::english();
        assert_eq!(lem.lemmatize("proceedings"), "proceedings");
        assert_eq!(lem.lemmatize("plaintiff"), "plaintiff");
        assert_eq!(lem.lemmatize("this"), "this");
    }

    #[test]
    fn base_forms_are_fixed_points() {
        let lem = Lemmatizer::english();
        for verb in ["appeal", "court", "dismiss", "use"] {
            assert_eq!(lem.lemmatize(verb), verb);
        }
    }

    #[test]
    fn lexicon_file_extends_vocabulary() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "# extra verbs\nestop\nestopped\testop").unwrap();
        let mut lem = Lemmatizer::english();
        let before = lem.lexicon_len();
        assert_eq!(lem.lemmatize("estops"), "estops");
        let added = lem.extend_from_file(tmp.path()).unwrap();
        assert_eq!(added, 2);
        assert_eq!(lem.lexicon_len(), before + 1);
        assert_eq!(lem.lemmatize("estops"), "estop");
        assert_eq!(lem.lemmatize("estopped"), "estop");
    }

    #[test]
    fn missing_lexicon_file_is_an_error() {
        let mut lem = Lemmatizer::english();
        assert!(lem.extend_from_file(Path::new("/nonexistent/verbs.txt")).is_err());
    }
}
