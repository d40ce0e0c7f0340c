use crate::util::constants::*;
use std::default::Default;
use strum_macros::EnumString;

/// How the heap grows when a collection did not free enough space.
#[derive(Copy, Clone, EnumString, Debug, PartialEq, Eq)]
pub enum GrowPolicySelector {
    /// Each space doubles in size.
    Double,
    /// Each space grows by the initial space size.
    Linear,
    /// The heap never grows.
    None,
}

/// The default maximum heap size.
pub const DEFAULT_MAX_HEAP_SIZE: usize = BYTES_IN_GBYTE;
/// The default initial heap size. Each of the two spaces starts at half of this.
pub const DEFAULT_INITIAL_HEAP_SIZE: usize = 512 * BYTES_IN_MBYTE;
/// The default size of a thread-local allocation buffer.
pub const DEFAULT_TLAB_SIZE: usize = 64 * BYTES_IN_KBYTE;
/// The default minimum size of the out-of-memory safety zone.
pub const DEFAULT_SAFETY_ZONE_SIZE: usize = 6 * BYTES_IN_KBYTE;

fn always_valid<T>(_: &T) -> bool {
    true
}

fn positive_page_aligned(v: &usize) -> bool {
    *v > 0 && *v % BYTES_IN_PAGE == 0
}

fn positive_word_aligned(v: &usize) -> bool {
    *v > 0 && *v % BYTES_IN_WORD == 0
}

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty [$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type [$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty [$validator:expr] = $default:expr),*) => [
        /// Collector options. Build one with `Options::default()` (which also reads
        /// `SSGC_*` environment variables) and adjust it through `set_from_str`.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }

        impl Options {
            /// Set an option by name. Returns false and keeps the old value if the name is
            /// unknown or the value cannot be parsed or fails validation.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            self.$name = val.clone();
                        } else {
                            warn!("Unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        warn!("Unable to set {}={:?}. Can't parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        warn!("Unknown option {}", s);
                        false
                    }
                }
            }

            /// Set options in bulk from a whitespace separated list of `name=value` pairs.
            /// Every pair is attempted; returns false if any of them was rejected.
            pub fn set_bulk_from_command_line(&mut self, options: &str) -> bool {
                let mut all_ok = true;
                for opt in options.split_ascii_whitespace() {
                    let kv: Vec<&str> = opt.split('=').collect();
                    if kv.len() != 2 {
                        warn!("Malformed option {:?}, expected name=value", opt);
                        all_ok = false;
                        continue;
                    }
                    if !self.set_from_str(kv[0], kv[1]) {
                        all_ok = false;
                    }
                }
                all_ok
            }

            pub(crate) fn new_without_env() -> Self {
                Options {
                    $($name: $default),*
                }
            }
        }

        impl Default for Options {
            fn default() -> Self {
                let mut options = Self::new_without_env();

                // Env vars such as SSGC_MAX_HEAP_SIZE override the defaults when their values are valid.
                const PREFIX: &str = "SSGC_";
                for (key, val) in std::env::vars() {
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    /// The heap never grows beyond this many bytes. Each space may be at most half of it.
    max_heap_size:        usize              [positive_page_aligned] = DEFAULT_MAX_HEAP_SIZE,
    /// The heap size at startup. Clamped to `max_heap_size`.
    initial_heap_size:    usize              [positive_page_aligned] = DEFAULT_INITIAL_HEAP_SIZE,
    /// Should mutators allocate from thread-local allocation buffers?
    use_tlab:             bool               [always_valid] = true,
    /// Size of each thread-local allocation buffer.
    tlab_size:            usize              [positive_word_aligned] = DEFAULT_TLAB_SIZE,
    /// How the heap grows.
    grow_policy:          GrowPolicySelector [always_valid] = GrowPolicySelector::Double,
    /// Minimum size of the headroom reserved for raising out-of-memory errors.
    safety_zone_size:     usize              [|v: &usize| *v % BYTES_IN_WORD == 0] = DEFAULT_SAFETY_ZONE_SIZE,
    /// Check every root and every to-space field around each collection.
    verify_references:    bool               [always_valid] = cfg!(debug_assertions),
    /// Overwrite the vacated from-space after each collection.
    zap_from_space:       bool               [always_valid] = cfg!(debug_assertions),
    /// Collect before every allocation from the global space.
    gc_before_allocation: bool               [always_valid] = false,
    /// Log collection start and end.
    trace_gc:             bool               [always_valid] = false,
    /// Log each collection phase.
    trace_gc_phases:      bool               [always_valid] = false,
    /// Log the phase timings of each collection.
    trace_gc_time:        bool               [always_valid] = false,
    /// Log every allocation from the global space.
    trace_allocation:     bool               [always_valid] = false,
}

impl Options {
    /// The initial size of each space.
    pub fn initial_space_size(&self) -> usize {
        crate::util::conversions::page_align_up(
            self.initial_heap_size.min(self.max_heap_size) / 2,
        )
    }

    /// The largest size a single space may grow to.
    pub fn max_space_size(&self) -> usize {
        crate::util::conversions::page_align_up(self.max_heap_size / 2)
    }

    /// The size of the safety zone actually reserved at the end of to-space.
    pub fn effective_safety_zone_size(&self) -> usize {
        if self.use_tlab {
            self.safety_zone_size.max(self.tlab_size)
        } else {
            self.safety_zone_size
        }
    }
}
