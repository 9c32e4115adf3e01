//! Database seeders for built-in data
//!
//! Seeds the demo package catalogue so a fresh install has something to show.
//! Runs only when the packages table is empty, so edits made through the admin
//! area are never overwritten.

use anyhow::Result;
use tracing::info;

use super::models::{CreatePackageRequest, Package, Status};
use crate::DbPool;

/// Seed the demo catalogue if no packages exist. Returns the number inserted.
pub async fn seed_demo_packages(pool: &DbPool) -> Result<usize> {
    if Package::count(pool).await? > 0 {
        return Ok(0);
    }

    info!("Seeding demo package catalogue...");

    let packages = demo_packages();
    let count = packages.len();
    for package in packages {
        Package::create(pool, package).await?;
    }

    info!("Seeded {} demo packages", count);
    Ok(count)
}

// Format: (id, title, destination, days, price, discount_price, description,
//          highlights, inclusions, exclusions, itinerary, image_url, featured)
type DemoPackage = (
    &'static str,
    &'static str,
    &'static str,
    i64,
    f64,
    f64,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    bool,
);

fn demo_packages() -> Vec<CreatePackageRequest> {
    let packages: Vec<DemoPackage> = vec![
        (
            "pkg_thailand_001",
            "Thailand Explorer: City & Coast Edition",
            "Thailand",
            7,
            35575.0,
            31289.0,
            "Experience the best of Thailand with a 7-day package covering Bangkok's vibrant city life and a coastal paradise. From temple hopping to beach relaxation, a blend of culture and leisure.",
            "Chao Phraya dinner cruise, Tiger kingdom, Temple visits, Beach activities, Shopping tours",
            "4-star accommodation, Daily breakfast, Airport transfers, Domestic flights, Sightseeing tours, English speaking guide",
            "International flights, Travel insurance, Visa fees, Personal expenses, Tips and gratuities",
            "Day 1: Arrival in Bangkok - Airport transfer to hotel, Evening Chao Phraya dinner cruise\nDay 2: Bangkok city tour - Grand Palace, Wat Pho temple, Local markets\nDay 3: Bangkok to Phuket - Domestic flight, Beach relaxation\nDay 4: Phuket island hopping - Phi Phi island tour with lunch\nDay 5: Tiger Kingdom and adventure activities\nDay 6: Free day for shopping and relaxation\nDay 7: Departure - Transfer to airport",
            "https://i.ibb.co/20fQ1nMQ/cdeeced219a0.jpg",
            true,
        ),
        (
            "pkg_dubai_001",
            "DUBAI 3 NIGHT 04 DAYS",
            "Dubai",
            4,
            29999.0,
            19999.0,
            "Discover the glamour of Dubai in an exciting 4-day package: world-class shopping, stunning architecture and desert adventures.",
            "Burj Khalifa visit, Desert safari, Dubai Mall, Gold Souk, Marina cruise",
            "3-star hotel accommodation, Daily breakfast, Airport transfers, Desert safari with BBQ dinner, Dubai city tour",
            "International flights, Travel insurance, Visa fees, Lunch and dinner (except mentioned), Personal shopping",
            "Day 1: Arrival - Airport transfer, Hotel check-in, Evening at leisure\nDay 2: Dubai city tour - Burj Khalifa, Dubai Mall, Gold Souk\nDay 3: Desert safari with BBQ dinner and entertainment\nDay 4: Departure - Last minute shopping, Transfer to airport",
            "https://i.ibb.co/xq9W5tJ4/7d127688b61c.jpg",
            true,
        ),
        (
            "pkg_phuket_001",
            "Budget Bliss in Phuket",
            "Thailand",
            4,
            17999.0,
            12699.0,
            "The beaches and nightlife of Phuket without breaking the bank, including the famous Phi Phi Island tour.",
            "Phi Phi island tour, Patong Beach, Local markets, Thai massage, Sunset viewing",
            "Budget hotel accommodation, Daily breakfast, Airport transfers, Phi Phi island tour with lunch, Local sightseeing",
            "International flights, Travel insurance, Visa fees, Dinners, Alcoholic beverages, Water sports",
            "Day 1: Arrival in Phuket - Airport transfer, Beach relaxation\nDay 2: Phi Phi island tour with lunch and snorkeling\nDay 3: Phuket city tour and Patong Beach visit\nDay 4: Departure - Transfer to airport",
            "https://i.ibb.co/Ld6jSyPr/775899a0d448.jpg",
            true,
        ),
        (
            "pkg_bali_001",
            "Bali Cultural Discovery",
            "Bali",
            6,
            42000.0,
            38000.0,
            "Ancient temples, traditional arts and pristine beaches in a comprehensive cultural tour of Bali.",
            "Tanah Lot temple, Ubud rice terraces, Traditional dance show, Volcano tour, Beach relaxation",
            "4-star resort accommodation, Daily breakfast, All transfers, Temple visits, Cultural performances, English guide",
            "International flights, Travel insurance, Visa fees, Lunches and dinners, Spa treatments, Shopping",
            "Day 1: Arrival - Airport transfer, Welcome dinner\nDay 2: Ubud tour - Rice terraces, Monkey forest, Art villages\nDay 3: Temple tour - Tanah Lot, Uluwatu with Kecak dance\nDay 4: Volcano tour - Mount Batur sunrise trek\nDay 5: Beach day - Sanur or Nusa Dua relaxation\nDay 6: Departure - Last minute shopping, Airport transfer",
            "https://i.ibb.co/placeholder-bali.jpg",
            false,
        ),
        (
            "pkg_singapore_001",
            "Singapore Highlights",
            "Singapore",
            5,
            49999.0,
            34999.0,
            "The garden city's major attractions, cultural districts and entertainment venues.",
            "Gardens by the Bay, Marina Bay Sands, Sentosa Island, Night Safari, Cultural quarters",
            "4-star hotel accommodation, Daily breakfast, All transfers, Attraction tickets, City tour, Night safari",
            "International flights, Travel insurance, Meals (except breakfast), Cable car rides, Shopping, Tips",
            "Day 1: Arrival - Airport transfer, Marina Bay area walk\nDay 2: City tour - Merlion, Chinatown, Little India, Arab Street\nDay 3: Gardens by the Bay and Marina Bay Sands SkyPark\nDay 4: Sentosa Island - Universal Studios or S.E.A. Aquarium\nDay 5: Night Safari, Departure preparation",
            "https://i.ibb.co/placeholder-singapore.jpg",
            false,
        ),
    ];

    packages
        .into_iter()
        .map(
            |(
                id,
                title,
                destination,
                days,
                price,
                discount_price,
                description,
                highlights,
                inclusions,
                exclusions,
                itinerary,
                image_url,
                featured,
            )| CreatePackageRequest {
                id: Some(id.to_string()),
                title: title.to_string(),
                destination: destination.to_string(),
                days,
                price,
                discount_price: Some(discount_price),
                description: description.to_string(),
                highlights: highlights.to_string(),
                inclusions: inclusions.to_string(),
                exclusions: exclusions.to_string(),
                itinerary: itinerary.to_string(),
                image_url: image_url.to_string(),
                featured,
                status: Status::Active,
            },
        )
        .collect()
}
