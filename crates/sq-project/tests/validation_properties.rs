use proptest::prelude::*;
use sq_project::schema::RunDef;
use sq_project::{ValidationError, validate_run};

proptest! {
    #[test]
    fn positive_block_values_validate(
        size in 1e-9f64..1e-5,
        temperature in 1.0f64..2000.0,
        block_count in 1usize..8,
    ) {
        let mut run = RunDef::default_chain("r", "Chain", block_count);
        for block in &mut run.blocks {
            block.size_m = size;
            block.temperature_k = temperature;
        }
        prop_assert!(validate_run(&run, "runs[0]").is_ok());
    }

    #[test]
    fn non_positive_temperature_names_the_block(
        block_count in 1usize..8,
        pick in 0usize..8,
        temperature in -500.0f64..=0.0,
    ) {
        let bad = pick % block_count;
        let mut run = RunDef::default_chain("r", "Chain", block_count);
        run.blocks[bad].temperature_k = temperature;
        let err = validate_run(&run, "runs[2]").unwrap_err();
        prop_assert!(matches!(err, ValidationError::InvalidValue { .. }), "expected InvalidValue, got {:?}", err);
        let expected = format!("runs[2].blocks[{bad}].temperature_k");
        prop_assert_eq!(err.field(), Some(expected.as_str()));
    }
}
