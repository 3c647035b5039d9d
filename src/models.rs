use serde::{Deserialize, Serialize};

/// Column order of the destination worksheet. The header row is seeded by the
/// crawler binary; the crawl core itself only ever appends below it.
pub const COLUMNS: [&str; 8] = [
    "title",
    "price",
    "description",
    "url",
    "floor",
    "height",
    "area",
    "city",
];

/// One scraped advert. All fields are kept as displayed on the page; the
/// numeric ones (`floor`, `height`, `area`) hold a bare digit run or stay
/// empty when the page carries no matching label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: String,
    pub description: String,
    pub url: String,
    pub floor: String,
    pub height: String,
    pub area: String,
    pub city: String,
}

impl Listing {
    /// Sheet row in `COLUMNS` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.price.clone(),
            self.description.clone(),
            self.url.clone(),
            self.floor.clone(),
            self.height.clone(),
            self.area.clone(),
            self.city.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_follows_column_order() {
        let listing = Listing {
            title: "2-кімнатна квартира".to_string(),
            price: "35 000 $".to_string(),
            description: "Простора квартира".to_string(),
            url: "https://example.com/ad/1".to_string(),
            floor: "5".to_string(),
            height: "9".to_string(),
            area: "54".to_string(),
            city: "Київ".to_string(),
        };

        let row = listing.to_row();
        assert_eq!(row.len(), COLUMNS.len());
        assert_eq!(row[0], "2-кімнатна квартира");
        assert_eq!(row[3], "https://example.com/ad/1");
        assert_eq!(row[7], "Київ");
    }
}
