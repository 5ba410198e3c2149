//! Source kinds that fold straight into the program text: constants and
//! engine-supplied material parameters. None of them schedule a register;
//! consumers reference the interned constant or the uniform member directly.

use super::{Literal, NodeData};

pub(super) fn constant_color_data(rgba: [f32; 4]) -> NodeData {
    let mut data = NodeData::inline();
    data.literals.push(("c", Literal::vec4(rgba)));
    data
}

pub(super) fn scalar_constant_data(value: f32) -> NodeData {
    let mut data = NodeData::inline();
    data.literals.push(("c", Literal::scalar(value)));
    data
}

pub(super) fn material_param_data(name: &str) -> NodeData {
    let mut data = NodeData::inline();
    data.params.push(name.to_string());
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_intern_exact_bit_patterns() {
        let a = constant_color_data([0.0, 0.0, 0.0, 1.0]);
        let b = constant_color_data([-0.0, 0.0, 0.0, 1.0]);
        assert_ne!(a.literals[0].1, b.literals[0].1);
        assert!(!a.needs_register);
    }

    #[test]
    fn params_record_the_uniform_name() {
        let data = material_param_data("tint");
        assert_eq!(data.params, vec!["tint".to_string()]);
        assert!(data.literals.is_empty());
    }
}
