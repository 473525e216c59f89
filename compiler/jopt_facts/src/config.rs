//! Analysis configuration.
//!
//! Member sets use internal names and a compact pattern syntax:
//!
//! | Pattern | Matches |
//! |---------|---------|
//! | `app/Main` | the class `app/Main` |
//! | `app/Main.*` | every member of `app/Main` |
//! | `app/Main.run` | every member named `run` |
//! | `app/Main.run([Ljava/lang/String;)V` | one method |
//! | `app/Main.count:I` | one field |

use jopt_eval::EvaluatorConfig;
use jopt_ir::{INIT, JAVA_LANG_OBJECT};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::AnalysisError;

/// Which instructions count as side effects besides field stores, calls to
/// side-effecting methods, and monitors.
///
/// Different optimizations need different notions: dead code removal must
/// keep array stores but can drop a return, while code motion must not move
/// an instruction past one that may throw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct SideEffectOptions {
    /// Return instructions end the method and are side effects.
    pub include_returns: bool,
    /// Stores into array elements are side effects.
    pub include_array_stores: bool,
    /// Instructions that may throw a JVM-raised exception (null checks,
    /// bounds checks, division by zero, failed casts) are side effects.
    pub include_builtin_exceptions: bool,
}

impl Default for SideEffectOptions {
    fn default() -> Self {
        Self {
            include_returns: false,
            include_array_stores: true,
            include_builtin_exceptions: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MemberPattern {
    /// `None` matches any member name.
    name: Option<String>,
    /// `None` matches any descriptor.
    descriptor: Option<String>,
}

impl MemberPattern {
    fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name.as_deref().map_or(true, |n| n == name)
            && self.descriptor.as_deref().map_or(true, |d| d == descriptor)
    }
}

/// A set of classes and members named by pattern.
#[derive(Clone, Debug, Default)]
pub struct MemberSet {
    classes: FxHashSet<String>,
    members: FxHashMap<String, Vec<MemberPattern>>,
}

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every entry into a new set.
    pub fn parse<I, S>(entries: I) -> Result<Self, AnalysisError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry.as_ref())?;
        }
        Ok(set)
    }

    /// Add one pattern.
    pub fn insert(&mut self, pattern: &str) -> Result<(), AnalysisError> {
        let bad = |reason| AnalysisError::BadPattern {
            pattern: pattern.to_owned(),
            reason,
        };
        let Some((class, member)) = pattern.split_once('.') else {
            if pattern.is_empty() {
                return Err(bad("empty class name"));
            }
            self.add_class(pattern);
            return Ok(());
        };
        if class.is_empty() {
            return Err(bad("empty class name"));
        }

        let (name, descriptor) = if let Some(paren) = member.find('(') {
            (&member[..paren], Some(&member[paren..]))
        } else if let Some((name, descriptor)) = member.split_once(':') {
            (name, Some(descriptor))
        } else {
            (member, None)
        };
        if name.is_empty() {
            return Err(bad("empty member name"));
        }
        if descriptor.is_some_and(str::is_empty) {
            return Err(bad("empty descriptor"));
        }

        self.members
            .entry(class.to_owned())
            .or_default()
            .push(MemberPattern {
                name: (name != "*").then(|| name.to_owned()),
                descriptor: descriptor.map(str::to_owned),
            });
        Ok(())
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_owned());
    }

    pub fn add_member(&mut self, class: &str, name: &str, descriptor: &str) {
        self.members
            .entry(class.to_owned())
            .or_default()
            .push(MemberPattern {
                name: Some(name.to_owned()),
                descriptor: Some(descriptor.to_owned()),
            });
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.members.is_empty()
    }

    pub fn contains_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn contains_member(&self, class: &str, name: &str, descriptor: &str) -> bool {
        self.members
            .get(class)
            .is_some_and(|patterns| patterns.iter().any(|p| p.matches(name, descriptor)))
    }
}

/// Library classes whose static initialization has no side effects.
const PURE_LIBRARY_CLASSES: [&str; 4] = [
    JAVA_LANG_OBJECT,
    "java/lang/Enum",
    "java/lang/Number",
    "java/lang/String",
];

/// Library methods without side effects that let no argument escape.
const PURE_LIBRARY_METHODS: [(&str, &str, &str); 5] = [
    (JAVA_LANG_OBJECT, INIT, "()V"),
    ("java/lang/Enum", INIT, "(Ljava/lang/String;I)V"),
    ("java/lang/Enum", "ordinal", "()I"),
    ("java/lang/String", "length", "()I"),
    ("java/lang/String", "equals", "(Ljava/lang/Object;)Z"),
];

/// Configuration for one analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Iteration cap for the fixed-point driver.
    pub max_iterations: usize,
    /// Invocation counts above this are reported as unbounded.
    pub invocation_count_limit: u32,
    /// Side-effect notion used for `has_side_effects`.
    pub side_effects: SideEffectOptions,
    /// Entry points and reflectively used members. Kept entities are
    /// reachable from outside the program.
    pub keep: MemberSet,
    /// Library classes whose initialization, and library methods whose
    /// invocation, have no side effects and let no argument escape.
    pub assume_no_side_effects: MemberSet,
    pub evaluator: EvaluatorConfig,
    /// Check after every marker that no fact was lowered.
    pub verify_monotonicity: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let mut assume_no_side_effects = MemberSet::new();
        for class in PURE_LIBRARY_CLASSES {
            assume_no_side_effects.add_class(class);
        }
        for (class, name, descriptor) in PURE_LIBRARY_METHODS {
            assume_no_side_effects.add_member(class, name, descriptor);
        }
        Self {
            max_iterations: 1000,
            invocation_count_limit: 10_000,
            side_effects: SideEffectOptions::default(),
            keep: MemberSet::new(),
            assume_no_side_effects,
            evaluator: EvaluatorConfig::default(),
            verify_monotonicity: cfg!(debug_assertions),
        }
    }
}
