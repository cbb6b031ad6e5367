use shared::{Accessory as SharedAccessory, Animal as SharedAnimal};

use crate::domain::models::animal::Animal as DomainAnimal;

pub struct AnimalMapper;

impl AnimalMapper {
    pub fn to_dto(domain: DomainAnimal) -> SharedAnimal {
        SharedAnimal {
            id: domain.id,
            species: domain.species,
            name: domain.name,
            level: domain.level,
            child_id: domain.child_id,
            last_fed: domain.last_fed.map(|t| t.to_rfc3339()),
            last_level_up: domain.last_level_up.map(|t| t.to_rfc3339()),
            accessories: domain
                .accessories
                .into_iter()
                .map(|a| SharedAccessory {
                    item: a.item,
                    price: a.price,
                    purchased_at: a.purchased_at.to_rfc3339(),
                })
                .collect(),
            created_at: domain.created_at.to_rfc3339(),
        }
    }
}
