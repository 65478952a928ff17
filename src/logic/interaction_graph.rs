use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::MatrixError;
use crate::model::{Id, Pact, Pacticipant, Version};
use crate::store::traits::Store;

/// A consumer/provider pair that has exchanged at least one pact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub consumer: Pacticipant,
    pub provider: Pacticipant,
    /// Whether the integration still matters for the version being evaluated
    pub live: bool,
    pub first_published_at: DateTime<Utc>,
    pub last_published_at: DateTime<Utc>,
    pub pact_count: usize,
}

/// Every integration a pacticipant takes part in, in both roles
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionGraph {
    pub pacticipant: Pacticipant,
    pub as_consumer: Vec<Integration>,
    pub as_provider: Vec<Integration>,
}

impl InteractionGraph {
    pub fn is_empty(&self) -> bool {
        self.as_consumer.is_empty() && self.as_provider.is_empty()
    }

    pub fn counterparts(&self) -> impl Iterator<Item = &Pacticipant> {
        self.as_consumer
            .iter()
            .map(|i| &i.provider)
            .chain(self.as_provider.iter().map(|i| &i.consumer))
    }
}

/// The integrations reachable from one pacticipant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub pacticipants: Vec<String>,
    pub integrations: Vec<NetworkEdge>,
    /// More pacticipants were reachable than the limit allowed
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub consumer_name: String,
    pub provider_name: String,
}

pub struct InteractionGraphBuilder;

impl InteractionGraphBuilder {
    /// Build the integrations of a pacticipant from its full publication
    /// history.
    ///
    /// In the consumer role an integration is live when the evaluated version
    /// has a pact with the provider, or the newest version does when no
    /// version is given. In the provider role it is live when the consumer's
    /// newest version has a pact with this pacticipant.
    pub async fn build<S: Store + ?Sized>(
        store: &S,
        pacticipant: &Pacticipant,
        version: Option<&Version>,
    ) -> Result<InteractionGraph, MatrixError> {
        let newest = store.find_latest_version(&pacticipant.id).await?;

        let as_consumer_pacts = store.list_pacts_for_consumer(&pacticipant.id).await?;
        let mut as_consumer = Vec::new();
        for (provider_id, pacts) in as_consumer_pacts
            .into_iter()
            .into_group_map_by(|p| p.provider_id.clone())
        {
            let Some(provider) = store.get_pacticipant(&provider_id).await? else {
                continue;
            };
            let live = match version.or(newest.as_ref()) {
                Some(current) => pacts.iter().any(|p| p.consumer_version_id == current.id),
                None => false,
            };
            as_consumer.push(Self::integration(pacticipant.clone(), provider, live, &pacts));
        }

        let as_provider_pacts = store.list_pacts_for_provider(&pacticipant.id).await?;
        let mut as_provider = Vec::new();
        for (consumer_id, pacts) in as_provider_pacts
            .into_iter()
            .into_group_map_by(|p| p.consumer_id.clone())
        {
            let Some(consumer) = store.get_pacticipant(&consumer_id).await? else {
                continue;
            };
            let consumer_newest = store.find_latest_version(&consumer.id).await?;
            let live = pacts.iter().any(|p| {
                consumer_newest
                    .as_ref()
                    .is_some_and(|n| n.id == p.consumer_version_id)
            });
            as_provider.push(Self::integration(consumer, pacticipant.clone(), live, &pacts));
        }

        as_consumer.sort_by_key(|i| i.provider.name.to_lowercase());
        as_provider.sort_by_key(|i| i.consumer.name.to_lowercase());

        Ok(InteractionGraph {
            pacticipant: pacticipant.clone(),
            as_consumer,
            as_provider,
        })
    }

    /// Breadth-first walk of the integration network around a pacticipant,
    /// visiting at most `max_pacticipants` pacticipants
    pub async fn network<S: Store + ?Sized>(
        store: &S,
        pacticipant_name: &str,
        max_pacticipants: usize,
    ) -> Result<Network, MatrixError> {
        let Some(start) = store.find_pacticipant_by_name(pacticipant_name).await? else {
            return Ok(Network::default());
        };

        let mut names: HashMap<Id, String> = HashMap::new();
        let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        let mut truncated = false;

        while let Some(current) = queue.pop_front() {
            if names.contains_key(&current.id) {
                continue;
            }
            if names.len() >= max_pacticipants {
                truncated = true;
                break;
            }
            names.insert(current.id.clone(), current.name.clone());

            let graph = Self::build(store, &current, None).await?;
            for integration in graph.as_consumer.iter().chain(graph.as_provider.iter()) {
                edges.insert((integration.consumer.id.clone(), integration.provider.id.clone()));
            }
            for counterpart in graph.counterparts() {
                if !names.contains_key(&counterpart.id) {
                    queue.push_back(counterpart.clone());
                }
            }
        }

        let integrations = edges
            .into_iter()
            .filter_map(|(consumer_id, provider_id)| {
                Some(NetworkEdge {
                    consumer_name: names.get(&consumer_id)?.clone(),
                    provider_name: names.get(&provider_id)?.clone(),
                })
            })
            .sorted_by(|a, b| {
                (&a.consumer_name, &a.provider_name).cmp(&(&b.consumer_name, &b.provider_name))
            })
            .collect();

        Ok(Network {
            pacticipants: names.into_values().sorted().collect(),
            integrations,
            truncated,
        })
    }

    fn integration(
        consumer: Pacticipant,
        provider: Pacticipant,
        live: bool,
        pacts: &[Pact],
    ) -> Integration {
        let first_published_at = pacts
            .iter()
            .map(|p| p.published_at)
            .min()
            .unwrap_or_else(Utc::now);
        let last_published_at = pacts
            .iter()
            .map(|p| p.published_at)
            .max()
            .unwrap_or_else(Utc::now);
        Integration {
            consumer,
            provider,
            live,
            first_published_at,
            last_published_at,
            pact_count: pacts.len(),
        }
    }
}
