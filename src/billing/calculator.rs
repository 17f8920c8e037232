//! Slab and time-of-use bill calculation.
//!
//! All accumulation runs at full precision; amounts are rounded to cents only
//! when they are written into the summary or a line item.

use tracing::debug;

use crate::domain::{
    BillEstimate, BillSummary, EstimateRequest, LineItem, LineItemKind, ResolvedTariff,
};
use crate::error::EstimateError;

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Price `request` against an already resolved plan.
///
/// Time-of-use units are charged on top of the slab charge for the full
/// `units`; they are a second pricing dimension, not a carve-out.
pub fn calculate(
    request: &EstimateRequest,
    tariff: &ResolvedTariff,
) -> Result<BillEstimate, EstimateError> {
    let units = request.units;
    let peak_units = request.peak_units;
    let off_peak_units = request.off_peak_units;

    // Tolerate representation error so splits like 0.1 + 0.2 of 0.3 pass.
    let excess = peak_units + off_peak_units - units;
    if excess > f64::EPSILON * units.max(1.0) * 4.0 {
        return Err(EstimateError::OverlappingUsage {
            peak: peak_units,
            off_peak: off_peak_units,
            units,
        });
    }

    let plan = &tariff.plan;
    if plan.slabs.is_empty() {
        return Err(EstimateError::InvalidPlan("plan has no slabs".into()));
    }

    let mut breakdown = Vec::with_capacity(plan.slabs.len() + 4);
    let mut remaining = units;
    let mut energy_charge = 0.0;

    for slab in &plan.slabs {
        if remaining <= 0.0 {
            break;
        }
        let consumed = match slab.capacity() {
            Some(capacity) => remaining.min(capacity),
            None => remaining,
        };
        if consumed <= 0.0 {
            continue;
        }
        let amount = consumed * slab.rate_per_unit;
        energy_charge += amount;
        remaining -= consumed;

        breakdown.push(LineItem {
            kind: LineItemKind::Slab,
            label: slab.label(),
            units: Some(round2(consumed)),
            rate_per_unit: Some(slab.rate_per_unit),
            rate: None,
            amount: round2(amount),
        });
    }

    if remaining > 0.0 {
        // Only reachable with a plan whose final slab is bounded.
        debug!(unallocated = remaining, "slabs exhausted before all units were priced");
    }

    let peak_charge = peak_units * plan.peak_rate;
    let off_peak_charge = off_peak_units * plan.off_peak_rate;
    let fixed_charge = plan.fixed_charge;
    let sub_total = energy_charge + peak_charge + off_peak_charge + fixed_charge;
    let tax = sub_total * plan.tax_rate;
    let estimated_bill = sub_total + tax;
    if !sub_total.is_finite() {
        return Err(EstimateError::AmountOutOfRange("subTotal"));
    }
    if !estimated_bill.is_finite() {
        return Err(EstimateError::AmountOutOfRange("estimatedBill"));
    }

    breakdown.push(LineItem {
        kind: LineItemKind::Tou,
        label: "peak".into(),
        units: Some(round2(peak_units)),
        rate_per_unit: Some(plan.peak_rate),
        rate: None,
        amount: round2(peak_charge),
    });
    breakdown.push(LineItem {
        kind: LineItemKind::Tou,
        label: "offPeak".into(),
        units: Some(round2(off_peak_units)),
        rate_per_unit: Some(plan.off_peak_rate),
        rate: None,
        amount: round2(off_peak_charge),
    });
    breakdown.push(LineItem {
        kind: LineItemKind::Fixed,
        label: "fixedCharge".into(),
        units: None,
        rate_per_unit: None,
        rate: None,
        amount: round2(fixed_charge),
    });
    breakdown.push(LineItem {
        kind: LineItemKind::Tax,
        label: "tax".into(),
        units: None,
        rate_per_unit: None,
        rate: Some(plan.tax_rate),
        amount: round2(tax),
    });

    Ok(BillEstimate {
        month: request.month,
        year: request.year,
        provider: tariff.provider,
        source: tariff.source,
        units,
        estimated_bill: round2(estimated_bill),
        summary: BillSummary {
            energy_charge: round2(energy_charge),
            peak_charge: round2(peak_charge),
            off_peak_charge: round2(off_peak_charge),
            fixed_charge: round2(fixed_charge),
            tax: round2(tax),
            sub_total: round2(sub_total),
        },
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlanSource, Provider, Slab, TariffPlan};
    use crate::tariff::TariffCatalog;
    use proptest::prelude::*;
    use rstest::rstest;

    fn ceb(source: PlanSource) -> ResolvedTariff {
        let catalog = TariffCatalog::builtin();
        ResolvedTariff {
            provider: Provider::Ceb,
            source,
            plan: catalog.plan(Provider::Ceb).unwrap().clone(),
        }
    }

    fn request(units: f64, peak: f64, off_peak: f64) -> EstimateRequest {
        EstimateRequest {
            units,
            month: 2,
            year: Some(2026),
            provider: "CEB".into(),
            peak_units: peak,
            off_peak_units: off_peak,
        }
    }

    #[test]
    fn test_ceb_reference_bill() {
        let estimate = calculate(&request(120.0, 20.0, 40.0), &ceb(PlanSource::Local)).unwrap();

        let slabs: Vec<_> = estimate
            .items_of(LineItemKind::Slab)
            .map(|i| (i.label.as_str(), i.units.unwrap(), i.rate_per_unit.unwrap(), i.amount))
            .collect();
        assert_eq!(
            slabs,
            vec![
                ("1-30", 30.0, 8.0, 240.0),
                ("31-60", 30.0, 12.0, 360.0),
                ("61-120", 60.0, 20.0, 1200.0),
            ]
        );

        let s = &estimate.summary;
        assert_eq!(s.energy_charge, 1800.0);
        assert_eq!(s.peak_charge, 720.0);
        assert_eq!(s.off_peak_charge, 960.0);
        assert_eq!(s.fixed_charge, 400.0);
        assert_eq!(s.sub_total, 3880.0);
        assert_eq!(s.tax, 698.4);
        assert_eq!(estimate.estimated_bill, 4578.4);
        assert_eq!(estimate.source, PlanSource::Local);
        assert_eq!(estimate.provider, Provider::Ceb);
    }

    #[test]
    fn test_breakdown_order_is_fixed() {
        let estimate = calculate(&request(45.0, 0.0, 0.0), &ceb(PlanSource::Local)).unwrap();
        let shape: Vec<_> = estimate
            .breakdown
            .iter()
            .map(|i| (i.kind, i.label.as_str()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (LineItemKind::Slab, "1-30"),
                (LineItemKind::Slab, "31-60"),
                (LineItemKind::Tou, "peak"),
                (LineItemKind::Tou, "offPeak"),
                (LineItemKind::Fixed, "fixedCharge"),
                (LineItemKind::Tax, "tax"),
            ]
        );
        let tax = estimate.items_of(LineItemKind::Tax).next().unwrap();
        assert_eq!(tax.rate, Some(0.18));
    }

    #[test]
    fn test_overlapping_usage_rejected() {
        let err = calculate(&request(100.0, 80.0, 80.0), &ceb(PlanSource::Local)).unwrap_err();
        assert!(matches!(err, EstimateError::OverlappingUsage { .. }));
    }

    #[test]
    fn test_exactly_full_split_is_allowed() {
        let estimate = calculate(&request(100.0, 60.0, 40.0), &ceb(PlanSource::Local)).unwrap();
        assert_eq!(estimate.summary.peak_charge, 60.0 * 36.0);
    }

    #[rstest]
    #[case(0.3, 0.1, 0.2)]
    #[case(100.3, 50.1, 50.2)]
    #[case(1.0, 0.7, 0.3)]
    fn test_decimal_full_split_is_allowed(
        #[case] units: f64,
        #[case] peak: f64,
        #[case] off_peak: f64,
    ) {
        assert!(calculate(&request(units, peak, off_peak), &ceb(PlanSource::Local)).is_ok());
    }

    #[test]
    fn test_overlap_just_past_total_rejected() {
        let err = calculate(&request(100.3, 50.1, 50.21), &ceb(PlanSource::Local)).unwrap_err();
        assert!(matches!(err, EstimateError::OverlappingUsage { .. }));
    }

    #[test]
    fn test_non_finite_total_rejected() {
        let err = calculate(&request(1e307, 0.0, 0.0), &ceb(PlanSource::Local)).unwrap_err();
        assert!(matches!(err, EstimateError::AmountOutOfRange(_)));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_zero_units() {
        let estimate = calculate(&request(0.0, 0.0, 0.0), &ceb(PlanSource::Local)).unwrap();
        assert_eq!(estimate.items_of(LineItemKind::Slab).count(), 0);
        assert_eq!(estimate.summary.energy_charge, 0.0);
        assert_eq!(estimate.estimated_bill, round2(400.0 * 1.18));
        assert_eq!(estimate.items_of(LineItemKind::Tou).count(), 2);
    }

    #[test]
    fn test_idempotent_output() {
        let req = request(233.7, 50.2, 71.9);
        let tariff = ceb(PlanSource::LocalFallback);
        let a = serde_json::to_vec(&calculate(&req, &tariff).unwrap()).unwrap();
        let b = serde_json::to_vec(&calculate(&req, &tariff).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bounded_tail_leaves_units_unpriced() {
        let tariff = ResolvedTariff {
            provider: Provider::Leco,
            source: PlanSource::External,
            plan: TariffPlan {
                slabs: vec![Slab::bounded(1.0, 10.0, 1.0)],
                fixed_charge: 0.0,
                peak_rate: 0.0,
                off_peak_rate: 0.0,
                tax_rate: 0.0,
            },
        };
        let estimate = calculate(&request(25.0, 0.0, 0.0), &tariff).unwrap();
        assert_eq!(estimate.summary.energy_charge, 10.0);
    }

    #[test]
    fn test_empty_plan_is_invalid() {
        let tariff = ResolvedTariff {
            provider: Provider::Ceb,
            source: PlanSource::External,
            plan: TariffPlan {
                slabs: vec![],
                fixed_charge: 0.0,
                peak_rate: 0.0,
                off_peak_rate: 0.0,
                tax_rate: 0.0,
            },
        };
        let err = calculate(&request(5.0, 0.0, 0.0), &tariff).unwrap_err();
        assert!(matches!(err, EstimateError::InvalidPlan(_)));
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(1.0, 8.0)]
    #[case(30.0, 240.0)]
    #[case(31.0, 252.0)]
    #[case(60.0, 600.0)]
    #[case(61.0, 620.0)]
    #[case(180.0, 3780.0)]
    #[case(200.0, 3780.0 + 20.0 * 52.0)]
    fn test_ceb_energy_charge_at_slab_edges(#[case] units: f64, #[case] expected: f64) {
        let estimate = calculate(&request(units, 0.0, 0.0), &ceb(PlanSource::Local)).unwrap();
        assert_eq!(estimate.summary.energy_charge, expected);
    }

    #[rstest]
    #[case(3.14159, 3.14)]
    #[case(0.125, 0.13)]
    #[case(698.4000000000001, 698.4)]
    #[case(-0.125, -0.13)]
    fn test_round2(#[case] input: f64, #[case] expected: f64) {
        assert!((round2(input) - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_slab_units_cover_request(units in 0.0f64..5_000.0) {
            let estimate = calculate(&request(units, 0.0, 0.0), &ceb(PlanSource::Local)).unwrap();
            let allocated: f64 = estimate
                .items_of(LineItemKind::Slab)
                .filter_map(|i| i.units)
                .sum();
            let slab_count = estimate.items_of(LineItemKind::Slab).count() as f64;
            // each emitted unit count is rounded to cents
            prop_assert!((allocated - units).abs() <= 0.005 * slab_count + 1e-9);
        }

        #[test]
        fn prop_totals_are_consistent(
            units in 0.0f64..2_000.0,
            peak_share in 0.0f64..0.45,
            off_peak_share in 0.0f64..0.45,
        ) {
            let req = request(units, units * peak_share, units * off_peak_share);
            let estimate = calculate(&req, &ceb(PlanSource::Local)).unwrap();
            let s = &estimate.summary;
            let parts = s.energy_charge + s.peak_charge + s.off_peak_charge + s.fixed_charge;
            // five independently rounded amounts, half a cent each at most
            prop_assert!((s.sub_total - parts).abs() <= 0.025 + 1e-9);
            prop_assert!((estimate.estimated_bill - (s.sub_total + s.tax)).abs() <= 0.015 + 1e-9);
        }
    }
}
