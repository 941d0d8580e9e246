/// Magnitude of the gap between a contract rate and an employee's own rate, as a whole
/// percentage of the contract rate.
///
/// Returns `None` when either rate is missing or the contract rate is zero. Halves round
/// up (12.5% -> 13%), computed in integer arithmetic so results are exact.
pub fn rate_difference_pct(contract_rate: Option<u32>, employee_rate: Option<u32>) -> Option<u32> {
    let contract = u64::from(contract_rate?);
    let employee = u64::from(employee_rate?);
    if contract == 0 {
        return None;
    }

    let diff = contract.abs_diff(employee);
    let pct = (diff * 200 + contract) / (contract * 2);
    Some(u32::try_from(pct).unwrap_or(u32::MAX))
}
