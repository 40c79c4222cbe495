//! Volatile form drafts: the address editor and the prescription builder.
//!
//! Both run on the same reducer/store machinery as the cart but persist
//! nothing; a process restart loses them by design. The address draft is
//! the only one with an effect: `Saved` announces itself on the event bus
//! so list screens can refetch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trolley_core::effect::Effect;
use trolley_core::event_bus::EventBus;
use trolley_core::reducer::Reducer;
use trolley_core::{SmallVec, smallvec};

use crate::types::ShippingType;

/// Topic published when an address draft is saved.
pub const ADDRESS_SAVED_TOPIC: &str = "address-saved";

/// A delivery address being composed or edited.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressDraft {
    pub title: String,
    pub address: String,
    pub area: String,
    pub direction: String,
    pub house: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub lat: f64,
    pub lng: f64,
}

/// Partial update for [`AddressDraft`]; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressUpdate {
    pub title: Option<String>,
    pub address: Option<String>,
    pub area: Option<String>,
    pub direction: Option<String>,
    pub house: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// The working draft plus the template `Reset` restores.
///
/// The template is seeded at construction so host apps can prefill city or
/// country level defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddressDraftState {
    pub template: AddressDraft,
    pub draft: AddressDraft,
}

impl AddressDraftState {
    /// Starts the draft as a copy of `template`.
    pub fn seeded(template: AddressDraft) -> Self {
        Self {
            draft: template.clone(),
            template,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AddressAction {
    Update(AddressUpdate),
    /// Restore the seeded template.
    Reset,
    /// The address was accepted by the host flow; announce and start over.
    Saved,
}

#[derive(Clone)]
pub struct AddressEnvironment {
    pub bus: Arc<dyn EventBus>,
}

impl std::fmt::Debug for AddressEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressEnvironment").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AddressReducer;

impl Reducer for AddressReducer {
    type State = AddressDraftState;
    type Action = AddressAction;
    type Environment = AddressEnvironment;

    fn reduce(
        &self,
        state: &mut AddressDraftState,
        action: AddressAction,
        env: &AddressEnvironment,
    ) -> SmallVec<[Effect<AddressAction>; 4]> {
        match action {
            AddressAction::Update(update) => {
                apply_address_update(&mut state.draft, update);
                SmallVec::new()
            }
            AddressAction::Reset => {
                state.draft = state.template.clone();
                SmallVec::new()
            }
            AddressAction::Saved => {
                state.draft = state.template.clone();
                let bus = Arc::clone(&env.bus);
                smallvec![Effect::future(async move {
                    bus.publish(ADDRESS_SAVED_TOPIC);
                    None
                })]
            }
        }
    }
}

fn apply_address_update(draft: &mut AddressDraft, update: AddressUpdate) {
    if let Some(title) = update.title {
        draft.title = title;
    }
    if let Some(address) = update.address {
        draft.address = address;
    }
    if let Some(area) = update.area {
        draft.area = area;
    }
    if let Some(direction) = update.direction {
        draft.direction = direction;
    }
    if let Some(house) = update.house {
        draft.house = house;
    }
    if let Some(customer_name) = update.customer_name {
        draft.customer_name = customer_name;
    }
    if let Some(customer_phone) = update.customer_phone {
        draft.customer_phone = customer_phone;
    }
    if let Some(lat) = update.lat {
        draft.lat = lat;
    }
    if let Some(lng) = update.lng {
        draft.lng = lng;
    }
}

/// One free-text line of a prescription order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionLine {
    pub text: String,
    pub qty: u32,
}

/// Partial update for the prescription draft's non-positional fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionUpdate {
    pub location_id: Option<String>,
    pub shipping_type: Option<ShippingType>,
    pub prescription_ids: Option<Vec<String>>,
}

/// A prescription order under construction: free-text lines addressed by
/// position plus fulfilment fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrescriptionDraftState {
    pub lines: Vec<PrescriptionLine>,
    pub location_id: String,
    pub shipping_type: ShippingType,
    /// Ids of uploaded prescription documents attached to this order.
    pub prescription_ids: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrescriptionAction {
    /// Append a line with quantity 1.
    AddText(String),
    EditTextAt { index: usize, text: String },
    RemoveAt { index: usize },
    /// Set a line's quantity; zero removes the line.
    SetQtyAt { index: usize, qty: u32 },
    Update(PrescriptionUpdate),
    Reset,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PrescriptionReducer;

impl Reducer for PrescriptionReducer {
    type State = PrescriptionDraftState;
    type Action = PrescriptionAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &mut PrescriptionDraftState,
        action: PrescriptionAction,
        _env: &(),
    ) -> SmallVec<[Effect<PrescriptionAction>; 4]> {
        match action {
            PrescriptionAction::AddText(text) => {
                state.lines.push(PrescriptionLine { text, qty: 1 });
            }
            PrescriptionAction::EditTextAt { index, text } => {
                match state.lines.get_mut(index) {
                    Some(line) => line.text = text,
                    None => out_of_range("edit", index, state.lines.len()),
                }
            }
            PrescriptionAction::RemoveAt { index } => {
                if index < state.lines.len() {
                    state.lines.remove(index);
                } else {
                    out_of_range("remove", index, state.lines.len());
                }
            }
            PrescriptionAction::SetQtyAt { index, qty } => {
                if index >= state.lines.len() {
                    out_of_range("set_qty", index, state.lines.len());
                } else if qty == 0 {
                    state.lines.remove(index);
                } else if let Some(line) = state.lines.get_mut(index) {
                    line.qty = qty;
                }
            }
            PrescriptionAction::Update(update) => {
                if let Some(location_id) = update.location_id {
                    state.location_id = location_id;
                }
                if let Some(shipping_type) = update.shipping_type {
                    state.shipping_type = shipping_type;
                }
                if let Some(prescription_ids) = update.prescription_ids {
                    state.prescription_ids = prescription_ids;
                }
            }
            PrescriptionAction::Reset => {
                *state = PrescriptionDraftState::default();
            }
        }
        SmallVec::new()
    }
}

fn out_of_range(op: &str, index: usize, len: usize) {
    tracing::debug!(op, index, len, "prescription line index out of range, ignoring");
}
