/// Derive a discount from the price pair when none was stated.
pub fn resolve_discount(explicit: u8, deal_price: Option<u32>, original_price: Option<u32>) -> u8 {
    if explicit != 0 {
        return explicit;
    }
    match (deal_price, original_price) {
        (Some(deal), Some(original)) if original > deal => {
            let saved = u64::from(original - deal) * 100;
            // saved / original < 100, so the cast cannot truncate
            (saved / u64::from(original)) as u8
        }
        _ => explicit,
    }
}
