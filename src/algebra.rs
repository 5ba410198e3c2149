//! Edge algebra: the (negate, swizzle) pair carried on every data edge.
//!
//! Every edge routes its source value through a component permutation and an
//! optional sign flip. Consumers that look through a chain of edges compose
//! these pairs transitively, so the algebra lives here as pure functions and
//! is shared by the signature generator, the scheduler and the emitter.

/// Number of addressable vector components.
pub const COMPONENT_COUNT: usize = 4;

const LETTERS: [char; COMPONENT_COUNT] = ['x', 'y', 'z', 'w'];

/// Maps a component letter to its canonical index.
///
/// Both the positional (`xyzw`) and the color (`rgba`) alphabets are
/// accepted, upper- or lowercase; anything else is invalid.
pub fn component_index(letter: char) -> Option<u8> {
    match letter.to_ascii_lowercase() {
        'x' | 'r' => Some(0),
        'y' | 'g' => Some(1),
        'z' | 'b' => Some(2),
        'w' | 'a' => Some(3),
        _ => None,
    }
}

/// Canonical (positional) letter for a component index.
pub fn component_letter(index: u8) -> Option<char> {
    LETTERS.get(index as usize).copied()
}

/// A four-slot component selection. Slot `k` of the routed value reads
/// component `self.0[k]` of the source value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const IDENTITY: Swizzle = Swizzle([0, 1, 2, 3]);

    /// A swizzle that reads the same component in every slot (`xxxx` style).
    pub fn broadcast(index: u8) -> Swizzle {
        Swizzle([index; 4])
    }

    pub fn is_identity(self) -> bool {
        self == Self::IDENTITY
    }

    /// If every slot names the same canonical index, returns it.
    pub fn uniform_index(self) -> Option<u8> {
        let [a, b, c, d] = self.0;
        (a == b && b == c && c == d).then_some(a)
    }

    /// Parses 1..=4 component letters. Shorter strings replicate the final
    /// letter into the remaining slots, so `"x"` parses as a broadcast.
    pub fn from_letters(s: &str) -> Option<Swizzle> {
        let chars: Vec<char> = s.chars().collect();
        if chars.is_empty() || chars.len() > COMPONENT_COUNT {
            return None;
        }
        let mut slots = [0u8; 4];
        let mut last = 0u8;
        for k in 0..COMPONENT_COUNT {
            if let Some(&ch) = chars.get(k) {
                last = component_index(ch)?;
            }
            slots[k] = last;
        }
        Some(Swizzle(slots))
    }

    /// The first `size` slots as canonical letters.
    pub fn letters(self, size: usize) -> String {
        self.0
            .iter()
            .take(size.min(COMPONENT_COUNT))
            .filter_map(|&i| component_letter(i))
            .collect()
    }

    /// Composes two selections: the outer swizzle indexes into the component
    /// list the inner swizzle already produced, not into the raw source.
    pub fn compose(outer: Swizzle, inner: Swizzle) -> Swizzle {
        let mut slots = [0u8; 4];
        for k in 0..COMPONENT_COUNT {
            slots[k] = inner.0[(outer.0[k] & 3) as usize];
        }
        Swizzle(slots)
    }

    /// Two-bit-per-slot packing used by the signature generator.
    pub(crate) fn packed(self) -> u32 {
        let [a, b, c, d] = self.0;
        (a as u32) | ((b as u32) << 2) | ((c as u32) << 4) | ((d as u32) << 6)
    }
}

impl Default for Swizzle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The full algebra value carried by an edge: sign flip plus selection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Routing {
    pub negate: bool,
    pub swizzle: Swizzle,
}

impl Routing {
    pub const IDENTITY: Routing = Routing {
        negate: false,
        swizzle: Swizzle::IDENTITY,
    };

    pub fn new(negate: bool, swizzle: Swizzle) -> Routing {
        Routing { negate, swizzle }
    }

    pub fn is_identity(self) -> bool {
        !self.negate && self.swizzle.is_identity()
    }

    /// Applies `outer` after `self`. Negation composes by XOR (a double
    /// negation cancels), the swizzles by [`Swizzle::compose`].
    pub fn then(self, outer: Routing) -> Routing {
        Routing {
            negate: self.negate ^ outer.negate,
            swizzle: Swizzle::compose(outer.swizzle, self.swizzle),
        }
    }

    /// Effective width of the value this routing carries out of a source of
    /// `source_width` components. A selection that reads one component in
    /// every slot collapses to a scalar broadcast regardless of the source.
    pub fn carried_size(self, source_width: usize) -> usize {
        if self.swizzle.uniform_index().is_some() {
            1
        } else {
            source_width
        }
    }

    /// Signature word for an edge landing on `port`; the caller omits the
    /// word entirely when the routing is the identity.
    pub(crate) fn signature_word(self, port: u16) -> u32 {
        ((port as u32) << 16) | ((self.negate as u32) << 8) | self.swizzle.packed()
    }
}

/// Formats the textual identifier for a routed value.
///
/// The shape is `[-]base[.letters]`: the minus prefix appears iff the
/// accumulated negate flag is set, and the swizzle suffix appears iff the
/// selection differs from the identity or the carried size is narrower than
/// the source. Scalar sources never take a suffix (there is nothing to
/// select). Every node kind names its inputs through this one function.
pub fn format_ident(base: &str, routing: Routing, size: usize, base_width: usize) -> String {
    let mut out = String::with_capacity(base.len() + 6);
    if routing.negate {
        out.push('-');
    }
    out.push_str(base);
    let plain = routing.swizzle.is_identity() && size == base_width;
    if base_width > 1 && !plain {
        out.push('.');
        out.push_str(&routing.swizzle.letters(size));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn routing(negate: bool, slots: [u8; 4]) -> Routing {
        Routing::new(negate, Swizzle(slots))
    }

    #[test]
    fn letter_codec_accepts_both_alphabets() {
        for (ch, idx) in [('x', 0), ('R', 0), ('g', 1), ('Z', 2), ('a', 3), ('W', 3)] {
            assert_eq!(component_index(ch), Some(idx));
        }
        assert_eq!(component_index('q'), None);
        assert_eq!(component_index('0'), None);
        assert_eq!(component_letter(2), Some('z'));
        assert_eq!(component_letter(4), None);
    }

    #[test]
    fn from_letters_replicates_the_tail() {
        assert_eq!(Swizzle::from_letters("x"), Some(Swizzle::broadcast(0)));
        assert_eq!(Swizzle::from_letters("yx"), Some(Swizzle([1, 0, 0, 0])));
        assert_eq!(Swizzle::from_letters("rgba"), Some(Swizzle::IDENTITY));
        assert_eq!(Swizzle::from_letters(""), None);
        assert_eq!(Swizzle::from_letters("xyzwx"), None);
        assert_eq!(Swizzle::from_letters("xq"), None);
    }

    #[test]
    fn broadcast_collapses_carried_size() {
        let r = routing(false, [2, 2, 2, 2]);
        assert_eq!(r.carried_size(4), 1);
        assert_eq!(r.carried_size(3), 1);
        assert_eq!(Routing::IDENTITY.carried_size(4), 4);
        assert_eq!(Routing::IDENTITY.carried_size(2), 2);
    }

    #[test]
    fn negation_is_xor_not_or() {
        let neg = routing(true, [0, 1, 2, 3]);
        assert!(!neg.then(neg).negate);
        assert!(neg.then(Routing::IDENTITY).negate);
    }

    #[test]
    fn compose_threads_through_prior_selection() {
        // Inner edge produced `wzyx`; an outer `x` selector must therefore
        // read the source's `w`, not its `x`.
        let inner = Swizzle([3, 2, 1, 0]);
        let outer = Swizzle::broadcast(0);
        assert_eq!(Swizzle::compose(outer, inner), Swizzle::broadcast(3));
    }

    #[test]
    fn ident_formatting_contract() {
        assert_eq!(format_ident("r0", Routing::IDENTITY, 4, 4), "r0");
        assert_eq!(format_ident("r0", routing(true, [0, 1, 2, 3]), 4, 4), "-r0");
        assert_eq!(format_ident("r0", routing(false, [1, 1, 1, 1]), 1, 4), "r0.y");
        assert_eq!(
            format_ident("r1", routing(false, [2, 1, 0, 3]), 4, 4),
            "r1.zyxw"
        );
        // Narrow carried sizes keep a suffix even under an identity swizzle.
        assert_eq!(format_ident("r2", Routing::IDENTITY, 2, 3), "r2.xy");
        // Scalar bases never take a suffix.
        assert_eq!(format_ident("k0", routing(true, [0, 0, 0, 0]), 1, 1), "-k0");
    }

    fn arb_routing() -> impl Strategy<Value = Routing> {
        (any::<bool>(), [0u8..4, 0u8..4, 0u8..4, 0u8..4])
            .prop_map(|(negate, s)| routing(negate, s))
    }

    proptest! {
        #[test]
        fn composition_is_associative(a in arb_routing(), b in arb_routing(), c in arb_routing()) {
            prop_assert_eq!(a.then(b).then(c), a.then(b.then(c)));
        }

        #[test]
        fn double_negation_cancels(a in arb_routing()) {
            let flip = Routing::new(true, Swizzle::IDENTITY);
            prop_assert_eq!(a.then(flip).then(flip).negate, a.negate);
        }

        #[test]
        fn uniform_swizzles_carry_scalars(i in 0u8..4, width in 1usize..=4) {
            let r = Routing::new(false, Swizzle::broadcast(i));
            prop_assert_eq!(r.carried_size(width), 1);
        }

        #[test]
        fn letters_roundtrip(s in arb_routing()) {
            let letters = s.swizzle.letters(4);
            prop_assert_eq!(Swizzle::from_letters(&letters), Some(s.swizzle));
        }
    }
}
