use serde::Serialize;

/// Static metadata for one watchlist company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyProfile {
    pub symbol: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
    pub sub_sector: &'static str,
    pub country: &'static str,
    pub description: &'static str,
    pub founded: u16,
    pub founders: &'static str,
    /// Hex display color, e.g. `#4285F4`.
    pub color: &'static str,
    /// Relative weight used only for display ordering/emphasis.
    pub weight: u8,
}

/// The fixed watchlist, in display order.
pub static WATCHLIST: [CompanyProfile; 7] = [
    CompanyProfile {
        symbol: "GOOGL",
        name: "Alphabet Inc. (Google)",
        sector: "Technology",
        sub_sector: "Internet Search & Advertising",
        country: "USA",
        description: "Global leader in internet search and digital advertising",
        founded: 1998,
        founders: "Larry Page, Sergey Brin",
        color: "#4285F4",
        weight: 20,
    },
    CompanyProfile {
        symbol: "AAPL",
        name: "Apple Inc.",
        sector: "Technology",
        sub_sector: "Consumer Electronics & Software",
        country: "USA",
        description: "Global leader in consumer technology and electronics",
        founded: 1976,
        founders: "Steve Jobs, Steve Wozniak, Ronald Wayne",
        color: "#A2AAAD",
        weight: 25,
    },
    CompanyProfile {
        symbol: "META",
        name: "Meta Platforms Inc.",
        sector: "Technology",
        sub_sector: "Social Networks & Metaverse",
        country: "USA",
        description: "Leader in social networks and connection platforms",
        founded: 2004,
        founders: "Mark Zuckerberg",
        color: "#1877F2",
        weight: 15,
    },
    CompanyProfile {
        symbol: "AMZN",
        name: "Amazon.com Inc.",
        sector: "Technology",
        sub_sector: "E-commerce & Cloud Computing",
        country: "USA",
        description: "Global leader in e-commerce and cloud services",
        founded: 1994,
        founders: "Jeff Bezos",
        color: "#FF9900",
        weight: 22,
    },
    CompanyProfile {
        symbol: "MSFT",
        name: "Microsoft Corporation",
        sector: "Technology",
        sub_sector: "Software & Cloud Computing",
        country: "USA",
        description: "Global leader in software and cloud solutions",
        founded: 1975,
        founders: "Bill Gates, Paul Allen",
        color: "#7FBA00",
        weight: 18,
    },
    CompanyProfile {
        symbol: "NFLX",
        name: "Netflix Inc.",
        sector: "Entertainment",
        sub_sector: "Video Streaming",
        country: "USA",
        description: "Global leader in video streaming",
        founded: 1997,
        founders: "Reed Hastings, Marc Randolph",
        color: "#E50914",
        weight: 8,
    },
    CompanyProfile {
        symbol: "TSLA",
        name: "Tesla Inc.",
        sector: "Automotive",
        sub_sector: "Electric Vehicles & Energy",
        country: "USA",
        description: "Leader in electric vehicles and renewable energy",
        founded: 2003,
        founders: "Martin Eberhard, Marc Tarpenning",
        color: "#E82127",
        weight: 12,
    },
];

/// Look up a watchlist profile by symbol (case-insensitive).
pub fn lookup(symbol: &str) -> Option<&'static CompanyProfile> {
    WATCHLIST
        .iter()
        .find(|p| p.symbol.eq_ignore_ascii_case(symbol))
}
