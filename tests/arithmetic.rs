//! The relay units against the integer reference model.

mod common;

use std::cell::RefCell;

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, TestRunner};
use z3::arith::{Operation, OperationUnit, TrapCause};
use z3::float::{FloatFormat, FloatingWord};

use common::{compose, reference, word, zero};

const Z3: FloatFormat = FloatFormat::Z3;

fn unit(op: Operation) -> OperationUnit {
    OperationUnit::build(op, Z3, 256, false).unwrap()
}

fn evaluate(unit: &mut OperationUnit, x: u32, y: u32) -> Result<u32, TrapCause> {
    unit.evaluate(FloatingWord::from_bits(x), FloatingWord::from_bits(y))
        .unwrap()
        .map(FloatingWord::bits)
}

/// Random operand pairs, one unit reused for every case.
fn matches_reference(op: Operation, range: i64, cases: u32) {
    let unit = RefCell::new(unit(op));
    let mut runner = TestRunner::new(ProptestConfig {
        cases,
        ..ProptestConfig::default()
    });
    runner
        .run(&(word(Z3, range), word(Z3, range)), |(x, y)| {
            let got = evaluate(&mut unit.borrow_mut(), x, y);
            let expected = reference(op, Z3, x, y);
            prop_assert_eq!(got, expected, "{} of {:#08x}, {:#08x}", op, x, y);
            Ok(())
        })
        .unwrap();
}

#[test]
fn add_matches_reference() {
    matches_reference(Operation::Add, 24, 48);
}

#[test]
fn sub_matches_reference() {
    matches_reference(Operation::Subtract, 24, 48);
}

#[test]
fn mul_matches_reference() {
    matches_reference(Operation::Multiply, 40, 40);
}

#[test]
fn div_matches_reference() {
    matches_reference(Operation::Divide, 40, 40);
}

#[test]
fn sqrt_matches_reference() {
    matches_reference(Operation::SquareRoot, 63, 40);
}

#[test]
fn reference_model_sanity() {
    let one = compose(Z3, false, 0, 0);
    let two = compose(Z3, false, 1, 0);
    let three = compose(Z3, false, 1, 1 << 13);
    assert_eq!(reference(Operation::Add, Z3, one, two), Ok(three));
    assert_eq!(reference(Operation::Subtract, Z3, three, two), Ok(one));
    assert_eq!(
        reference(Operation::Multiply, Z3, two, three),
        Ok(compose(Z3, false, 2, 1 << 13))
    );
    assert_eq!(
        reference(Operation::Divide, Z3, three, two),
        Ok(compose(Z3, false, 0, 1 << 13))
    );
    assert_eq!(
        reference(Operation::SquareRoot, Z3, compose(Z3, false, 2, 0), 0),
        Ok(two)
    );
    // the reference model and the I/O conversion agree on simple values
    assert_eq!(Z3.encode(3.0).unwrap().bits(), three);
    assert_eq!(Z3.zero().bits(), zero(Z3));
}

#[test]
fn rounding_carry_renormalizes() {
    // (2 - 2^-14) + 2^-15 rounds up to exactly 2
    let mut add = unit(Operation::Add);
    let almost_two = compose(Z3, false, 0, (1 << 14) - 1);
    let half_ulp = compose(Z3, false, -15, 0);
    let expected = compose(Z3, false, 1, 0);
    assert_eq!(reference(Operation::Add, Z3, almost_two, half_ulp), Ok(expected));
    assert_eq!(evaluate(&mut add, almost_two, half_ulp), Ok(expected));
}

#[test]
fn exact_cancellation_gives_canonical_zero() {
    let mut sub = unit(Operation::Subtract);
    let x = Z3.encode(-17.25).unwrap().bits();
    assert_eq!(evaluate(&mut sub, x, x), Ok(zero(Z3)));
}

#[test]
fn zero_operands() {
    let mut add = unit(Operation::Add);
    let mut sub = unit(Operation::Subtract);
    let x = Z3.encode(5.5).unwrap().bits();
    let z = zero(Z3);
    assert_eq!(evaluate(&mut add, x, z), Ok(x));
    assert_eq!(evaluate(&mut add, z, x), Ok(x));
    let negated = Z3.encode(-5.5).unwrap().bits();
    assert_eq!(evaluate(&mut sub, z, x), Ok(negated));
    assert_eq!(evaluate(&mut sub, z, z), Ok(z));

    let mut mul = unit(Operation::Multiply);
    assert_eq!(evaluate(&mut mul, x, z), Ok(z));
    let mut div = unit(Operation::Divide);
    assert_eq!(evaluate(&mut div, z, x), Ok(z));
    let mut sqrt = unit(Operation::SquareRoot);
    assert_eq!(evaluate(&mut sqrt, z, z), Ok(z));
}

#[test]
fn traps() {
    let big = compose(Z3, false, 40, 0);
    let tiny = compose(Z3, false, -40, 0);
    let mut mul = unit(Operation::Multiply);
    assert_eq!(evaluate(&mut mul, big, big), Err(TrapCause::Overflow));
    assert_eq!(evaluate(&mut mul, tiny, tiny), Err(TrapCause::Underflow));

    let mut div = unit(Operation::Divide);
    assert_eq!(evaluate(&mut div, big, zero(Z3)), Err(TrapCause::ZeroDivisor));
    assert_eq!(evaluate(&mut div, zero(Z3), zero(Z3)), Err(TrapCause::ZeroDivisor));
    assert_eq!(evaluate(&mut div, big, tiny), Err(TrapCause::Overflow));

    let mut sqrt = unit(Operation::SquareRoot);
    let minus_four = Z3.encode(-4.0).unwrap().bits();
    assert_eq!(evaluate(&mut sqrt, minus_four, 0), Err(TrapCause::NegativeRoot));

    // the largest magnitude doubled leaves the exponent range
    let max = compose(Z3, false, 63, (1 << 14) - 1);
    let mut add = unit(Operation::Add);
    assert_eq!(evaluate(&mut add, max, max), Err(TrapCause::Overflow));
}

#[test]
fn unit_recovers_after_trap() {
    let mut div = unit(Operation::Divide);
    let six = Z3.encode(6.0).unwrap().bits();
    let three = Z3.encode(3.0).unwrap().bits();
    assert_eq!(evaluate(&mut div, six, zero(Z3)), Err(TrapCause::ZeroDivisor));
    assert_eq!(evaluate(&mut div, six, three), Ok(Z3.encode(2.0).unwrap().bits()));
}

#[test]
fn narrow_format_matches_reference() {
    let f = FloatFormat::new(5, 6);
    let mut mul = OperationUnit::build(Operation::Multiply, f, 256, false).unwrap();
    let mut add = OperationUnit::build(Operation::Add, f, 256, false).unwrap();
    for (x, y) in [(1.5, 2.25), (-3.0, 0.375), (7.75, -7.5), (100.0, 0.01)] {
        let x = f.encode(x).unwrap();
        let y = f.encode(y).unwrap();
        let got = mul.evaluate(x, y).unwrap().map(FloatingWord::bits);
        assert_eq!(got, reference(Operation::Multiply, f, x.bits(), y.bits()));
        let got = add.evaluate(x, y).unwrap().map(FloatingWord::bits);
        assert_eq!(got, reference(Operation::Add, f, x.bits(), y.bits()));
    }
}
