use bondcalc_core::callable::{self, CallSchedule, ScenarioKind};
use bondcalc_core::cashflows::{self, BondParameters, BondSubtype};
use bondcalc_core::present_value;
use bondcalc_core::stress::apply_stress;
use bondcalc_core::valuation::{self, BondValuationInput};
use bondcalc_core::yields;
use bondcalc_core::{BondCalcError, InstrumentKind};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Cashflow generation
// ===========================================================================

#[test]
fn test_fixed_cashflows_reference_bond() {
    // 1000 face, 5% annual, 5 years
    let flows = cashflows::generate_cashflows(
        dec!(1000),
        dec!(0.05),
        5,
        1,
        BondSubtype::Fixed,
        None,
        Decimal::ZERO,
    )
    .unwrap();
    assert_eq!(flows, vec![dec!(50), dec!(50), dec!(50), dec!(50), dec!(1050)]);

    let pv = present_value::present_value(&flows, dec!(0.05), 1).unwrap();
    assert!(
        (pv - dec!(1000.00)).abs() < dec!(0.005),
        "Expected PV ~1000.00, got {pv}"
    );
}

#[test]
fn test_par_pricing_identity_across_frequencies() {
    for (coupon, maturity, freq) in [
        (dec!(0.03), 10u32, 1u32),
        (dec!(0.045), 7, 2),
        (dec!(0.08), 4, 4),
        (dec!(0.06), 3, 12),
    ] {
        let flows = BondParameters::fixed(dec!(1000), coupon, maturity, freq)
            .cashflows()
            .unwrap();
        let pv = present_value::present_value(&flows, coupon, freq).unwrap();
        assert!(
            (pv - dec!(1000)).abs() < dec!(0.000001),
            "coupon {coupon} freq {freq}: PV {pv} should be par"
        );
    }
}

#[test]
fn test_zero_coupon_ignores_structure() {
    let flows = cashflows::generate_cashflows(
        dec!(750),
        dec!(0.09),
        20,
        4,
        BondSubtype::ZeroCoupon,
        None,
        dec!(300),
    )
    .unwrap();
    assert_eq!(flows, vec![dec!(750)]);
}

#[test]
fn test_inflation_curve_too_short() {
    let err = cashflows::generate_cashflows(
        dec!(1000),
        dec!(0.05),
        5,
        2,
        BondSubtype::InflationLinked,
        Some(&[dec!(1.01); 9][..]),
        Decimal::ZERO,
    )
    .unwrap_err();
    assert!(matches!(err, BondCalcError::InvalidInput { .. }));
}

// ===========================================================================
// Yields
// ===========================================================================

#[test]
fn test_ytm_with_and_without_haircut() {
    // Orchestration defaults: 1000 face, 5%, 5y annual, price 950
    let base = BondParameters::fixed(dec!(1000), dec!(0.05), 5, 1);
    let haircut = BondParameters {
        haircut_bps: dec!(25),
        ..base.clone()
    };

    let ytm_base = yields::yield_to_maturity(&base.cashflows().unwrap(), dec!(950), 1).unwrap();
    let ytm_cut = yields::yield_to_maturity(&haircut.cashflows().unwrap(), dec!(950), 1).unwrap();

    assert!((ytm_base - dec!(6.193)).abs() < dec!(0.001), "base {ytm_base}");
    assert!((ytm_cut - dec!(6.180)).abs() < dec!(0.001), "haircut {ytm_cut}");
    assert!(ytm_cut < ytm_base);
}

#[test]
fn test_bare_yield_is_decimal_ytm_is_percent() {
    let flows = BondParameters::fixed(dec!(1000), dec!(0.05), 5, 1)
        .cashflows()
        .unwrap();
    let bare = yields::calculate_yield(&flows, dec!(950), 1).unwrap();
    let pct = yields::yield_to_maturity(&flows, dec!(950), 1).unwrap();
    assert_eq!(bare * dec!(100), pct);
}

// ===========================================================================
// Yield to worst
// ===========================================================================

#[test]
fn test_reference_callable_bond() {
    let schedule = CallSchedule::new(vec![5, 10], vec![dec!(1020), dec!(1010)]);
    let scenarios = callable::callable_scenarios(
        dec!(1000),
        dec!(0.05),
        &schedule,
        5,
        dec!(950),
        1,
        Decimal::ZERO,
    )
    .unwrap();

    let lengths: Vec<usize> = scenarios.iter().map(|s| s.cashflows.len()).collect();
    assert_eq!(lengths, vec![5, 10, 5]);

    let (ytw, worst) = callable::yield_to_worst(
        dec!(1000),
        dec!(0.05),
        &[5, 10],
        &[dec!(1020), dec!(1010)],
        5,
        dec!(950),
        1,
        Decimal::ZERO,
    )
    .unwrap();
    let min = scenarios
        .iter()
        .map(|s| s.yield_rate * dec!(100))
        .min()
        .unwrap();
    assert_eq!(ytw, min);
    assert_eq!(worst, scenarios[1].cashflows);
}

#[test]
fn test_ytw_never_exceeds_ytm() {
    for price in [dec!(900), dec!(950), dec!(1000), dec!(1050)] {
        let (ytw, _) = callable::yield_to_worst(
            dec!(1000),
            dec!(0.05),
            &[2, 3, 4],
            &[dec!(1030), dec!(1020), dec!(1010)],
            5,
            price,
            1,
            Decimal::ZERO,
        )
        .unwrap();
        let ytm = yields::yield_to_maturity(
            &BondParameters::fixed(dec!(1000), dec!(0.05), 5, 1)
                .cashflows()
                .unwrap(),
            price,
            1,
        )
        .unwrap();
        assert!(ytw <= ytm, "price {price}: ytw {ytw} > ytm {ytm}");
    }
}

#[test]
fn test_premium_bond_called_early_is_worst() {
    // Priced well above par, an early call at par hurts the most
    let out = callable::calculate_yield_to_worst(&callable::YieldToWorstInput {
        face_value: dec!(1000),
        coupon_rate: dec!(0.08),
        schedule: CallSchedule::new(vec![1, 3], vec![dec!(1000), dec!(1000)]),
        maturity: 10,
        market_price: dec!(1150),
        payment_frequency: 2,
        haircut_bps: Decimal::ZERO,
    })
    .unwrap();
    assert_eq!(
        out.result.worst_scenario,
        ScenarioKind::Call {
            call_date: 1,
            call_price: dec!(1000)
        }
    );
    assert!(out.result.ytw_pct < Decimal::ZERO);
}

// ===========================================================================
// Stress and facade
// ===========================================================================

#[test]
fn test_apply_stress_exact() {
    assert_eq!(
        apply_stress(dec!(0.03), dec!(0.02), dec!(50), dec!(100)),
        dec!(0.065)
    );
}

#[test]
fn test_stressed_pv_below_base() {
    let flows = BondParameters::fixed(dec!(1000), dec!(0.05), 5, 1)
        .cashflows()
        .unwrap();
    let base = present_value::present_value(&flows, dec!(0.05), 1).unwrap();
    let stressed = present_value::stressed_present_value(
        &flows,
        dec!(0.03),
        dec!(0.02),
        dec!(50),
        dec!(100),
        1,
    )
    .unwrap();
    assert!(stressed < base);
}

#[test]
fn test_value_bond_from_json_request() {
    let input: BondValuationInput = serde_json::from_str(
        r#"{
            "instrument": "gilt",
            "face_value": "1000",
            "coupon_rate": "0.05",
            "maturity": 5,
            "payment_frequency": 1,
            "subtype": "inflation-linked",
            "inflation_curve": ["1.01", "1.02", "1.03", "1.04", "1.05"],
            "market_price": "950",
            "discount_rate": "0.05",
            "stress": { "rfr": "0.03", "spread": "0.02", "stress_rfr_bps": "50", "stress_spread_bps": "100" }
        }"#,
    )
    .unwrap();
    let out = valuation::value_bond(&input).unwrap();
    let r = &out.result;
    assert_eq!(r.instrument, InstrumentKind::Gilt);
    assert_eq!(r.cashflows[4], dec!(1102.50));
    assert!(r.present_value.unwrap() > dec!(1000));
    assert!(r.stressed_present_value.unwrap() < r.present_value.unwrap());
}
