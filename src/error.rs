
/*!

This module is for managing errors in the router core. Violations of the flow-control invariants (overflowing a buffer, taking a virtual channel twice, etc.) are reported as an `Error` and propagated up to the simulation loop, which then aborts the run. Cases that should never happen can be kept as `panic!`.

Instead of `expect` or `unwrap_or_else` try
* `ok_or_else` like in `.ok_or_else( ||Error::new(source_location!(),ErrorKind::Undetermined) )?;`

Instead of `panic!` try
* Return an error. E.g., by `return Err( Error::buffer_overflow(source_location!(),Some(vc)) );`

Soft stalls of the pipeline are not errors, they are handled by requeuing.

*/

use std::fmt::{Display,Formatter};

use crate::buffer::VcState;

/// The main Error class to be used in each `Result(Whatever,Error)`.
/// It contains the code source of the error and its kind.
/// An arbitrary `String` message can be optionally attached.
#[derive(Debug)]
pub struct Error
{
	pub source_location: SourceLocation,
	pub kind: ErrorKind,
	pub message: Option<String>,
}

/// A source code location where an error occurred.
/// Contains the values of the macros `std::{file,line,column}`.
#[derive(Debug)]
pub struct SourceLocation
{
	pub file: &'static str,
	pub line: u32,
	pub column: u32,
}

#[derive(Debug)]
pub enum ErrorKind
{
	/// A buffer, or the remote view of a buffer, got more flits than its capacity.
	/// `vc` is set when the overflow is attributed to a virtual channel.
	BufferOverflow{
		vc: Option<usize>,
	},
	/// Some occupancy counter would go below zero.
	BufferUnderflow{
		vc: Option<usize>,
	},
	/// Tried to take a virtual channel of a remote buffer that was still in use.
	VirtualChannelInUse{
		vc: usize,
		used_by: usize,
	},
	/// Received a credit for a virtual channel that nobody is using, while waiting for tail credits.
	CreditForIdleVirtualChannel{
		vc: usize,
	},
	/// Tried to extract a flit from an empty virtual channel.
	EmptyVirtualChannel{
		vc: usize,
	},
	/// Tried to extract a flit from a virtual channel in the idle state.
	IdleVirtualChannel{
		vc: usize,
	},
	/// A virtual channel was asked to perform a transition outside its state machine.
	InvalidStateTransition{
		from: VcState,
		to: VcState,
	},
	UnknownAllocator{
		name: String,
	},
	UnknownArbiter{
		name: String,
	},
	UnknownBufferPolicy{
		name: String,
	},
	UnknownRouter{
		name: String,
	},
	UnknownRoutingFunction{
		name: String,
	},
	/// A pipeline stage was configured with a delay of zero cycles, which it does not support.
	ZeroDelay{
		stage: &'static str,
	},
	/// An allocator received a second request for the same input/output pair.
	DuplicateRequest{
		input: usize,
		output: usize,
	},
	/// A channel was given two items in the same cycle.
	ChannelOverrun,
	/// Some configuration options cannot be used together.
	IncompatibleConfiguration,
	/// The delay configuration has no entry for the router.
	MissingDelays{
		router: usize,
	},
	/// Any other error. Better to add new types than to use this thing.
	Undetermined,
}

// source_location!()
#[macro_export]
macro_rules! source_location{
	() => {
		$crate::error::SourceLocation{
			file: file!(),
			line: line!(),
			column: column!(),
		}
	}
}

use ErrorKind::*;

impl Error
{
	pub fn new(source_location:SourceLocation, kind:ErrorKind) -> Error
	{
		Error{
			source_location,
			kind,
			message:None,
		}
	}
	pub fn with_message(mut self,message:String) -> Error
	{
		self.message=Some(message);
		self
	}
	/// example call: `Error::buffer_overflow(source_location!(),Some(vc))`.
	pub fn buffer_overflow(source_location:SourceLocation,vc:Option<usize>)->Error
	{
		Error{
			source_location,
			kind: BufferOverflow{
				vc,
			},
			message:None,
		}
	}
	pub fn buffer_underflow(source_location:SourceLocation,vc:Option<usize>)->Error
	{
		Error{
			source_location,
			kind: BufferUnderflow{
				vc,
			},
			message:None,
		}
	}
	pub fn virtual_channel_in_use(source_location:SourceLocation,vc:usize,used_by:usize)->Error
	{
		Error{
			source_location,
			kind: VirtualChannelInUse{
				vc,
				used_by,
			},
			message:None,
		}
	}
	pub fn credit_for_idle_virtual_channel(source_location:SourceLocation,vc:usize)->Error
	{
		Error{
			source_location,
			kind: CreditForIdleVirtualChannel{
				vc,
			},
			message:None,
		}
	}
	pub fn empty_virtual_channel(source_location:SourceLocation,vc:usize)->Error
	{
		Error{
			source_location,
			kind: EmptyVirtualChannel{
				vc,
			},
			message:None,
		}
	}
	pub fn idle_virtual_channel(source_location:SourceLocation,vc:usize)->Error
	{
		Error{
			source_location,
			kind: IdleVirtualChannel{
				vc,
			},
			message:None,
		}
	}
	pub fn invalid_state_transition(source_location:SourceLocation,from:VcState,to:VcState)->Error
	{
		Error{
			source_location,
			kind: InvalidStateTransition{
				from,
				to,
			},
			message:None,
		}
	}
	pub fn unknown_allocator(source_location:SourceLocation,name:String)->Error
	{
		Error{
			source_location,
			kind: UnknownAllocator{
				name,
			},
			message:None,
		}
	}
	pub fn unknown_arbiter(source_location:SourceLocation,name:String)->Error
	{
		Error{
			source_location,
			kind: UnknownArbiter{
				name,
			},
			message:None,
		}
	}
	pub fn unknown_buffer_policy(source_location:SourceLocation,name:String)->Error
	{
		Error{
			source_location,
			kind: UnknownBufferPolicy{
				name,
			},
			message:None,
		}
	}
	pub fn unknown_router(source_location:SourceLocation,name:String)->Error
	{
		Error{
			source_location,
			kind: UnknownRouter{
				name,
			},
			message:None,
		}
	}
	pub fn unknown_routing_function(source_location:SourceLocation,name:String)->Error
	{
		Error{
			source_location,
			kind: UnknownRoutingFunction{
				name,
			},
			message:None,
		}
	}
	pub fn zero_delay(source_location:SourceLocation,stage:&'static str)->Error
	{
		Error{
			source_location,
			kind: ZeroDelay{
				stage,
			},
			message:None,
		}
	}
	pub fn duplicate_request(source_location:SourceLocation,input:usize,output:usize)->Error
	{
		Error{
			source_location,
			kind: DuplicateRequest{
				input,
				output,
			},
			message:None,
		}
	}
	pub fn channel_overrun(source_location:SourceLocation)->Error
	{
		Error{
			source_location,
			kind: ChannelOverrun,
			message:None,
		}
	}
	pub fn incompatible_configuration(source_location:SourceLocation)->Error
	{
		Error{
			source_location,
			kind: IncompatibleConfiguration,
			message:None,
		}
	}
	pub fn missing_delays(source_location:SourceLocation,router:usize)->Error
	{
		Error{
			source_location,
			kind: MissingDelays{
				router,
			},
			message:None,
		}
	}
	pub fn undetermined(source_location:SourceLocation)->Error
	{
		Error{
			source_location,
			kind: Undetermined,
			message:None,
		}
	}
}


impl Display for Error
{
	fn fmt(&self, formatter: &mut Formatter<'_>) -> std::result::Result<(), std::fmt::Error>
	{
		let Error{source_location:location,kind,message} = self;
		writeln!(formatter,"Error at file {} at line {} column {}.",location.file,location.line,location.column)?;
		if let Some(text) = message
		{
			writeln!(formatter,"{}",text)?;
		}
		kind.fmt(formatter)?;
		Ok(())
	}
}

impl Display for ErrorKind
{
	fn fmt(&self, formatter: &mut Formatter<'_>) -> std::result::Result<(), std::fmt::Error>
	{
		match self
		{
			BufferOverflow{vc} =>
			{
				match vc
				{
					Some(vc) => writeln!(formatter,"BufferOverflow error: the buffer for virtual channel {} exceeded its capacity.",vc)?,
					None => writeln!(formatter,"BufferOverflow error: the buffer exceeded its capacity.")?,
				}
			},
			BufferUnderflow{vc} =>
			{
				match vc
				{
					Some(vc) => writeln!(formatter,"BufferUnderflow error: the occupancy of virtual channel {} went below zero.",vc)?,
					None => writeln!(formatter,"BufferUnderflow error: an occupancy counter went below zero.")?,
				}
			},
			VirtualChannelInUse{vc,used_by} =>
			{
				writeln!(formatter,"VirtualChannelInUse error: virtual channel {} is already taken by {}.",vc,used_by)?;
			},
			CreditForIdleVirtualChannel{vc} =>
			{
				writeln!(formatter,"CreditForIdleVirtualChannel error: received a credit for virtual channel {}, which is not in use.",vc)?;
			},
			EmptyVirtualChannel{vc} =>
			{
				writeln!(formatter,"EmptyVirtualChannel error: tried to remove a flit from the empty virtual channel {}.",vc)?;
			},
			IdleVirtualChannel{vc} =>
			{
				writeln!(formatter,"IdleVirtualChannel error: tried to remove a flit from virtual channel {} while idle.",vc)?;
			},
			InvalidStateTransition{from,to} =>
			{
				writeln!(formatter,"InvalidStateTransition error: a virtual channel cannot go from {:?} to {:?}.",from,to)?;
			},
			UnknownAllocator{name} =>
			{
				writeln!(formatter,"UnknownAllocator error: there is no allocator named {}.",name)?;
			},
			UnknownArbiter{name} =>
			{
				writeln!(formatter,"UnknownArbiter error: there is no arbiter named {}.",name)?;
			},
			UnknownBufferPolicy{name} =>
			{
				writeln!(formatter,"UnknownBufferPolicy error: there is no buffer policy named {}.",name)?;
			},
			UnknownRouter{name} =>
			{
				writeln!(formatter,"UnknownRouter error: there is no router named {}.",name)?;
			},
			UnknownRoutingFunction{name} =>
			{
				writeln!(formatter,"UnknownRoutingFunction error: there is no routing function named {}.",name)?;
			},
			ZeroDelay{stage} =>
			{
				writeln!(formatter,"ZeroDelay error: the {} stage requires a delay of at least one cycle.",stage)?;
			},
			DuplicateRequest{input,output} =>
			{
				writeln!(formatter,"DuplicateRequest error: there is already a request from input {} to output {}.",input,output)?;
			},
			ChannelOverrun =>
			{
				writeln!(formatter,"ChannelOverrun error: a channel accepts a single item per cycle.")?;
			},
			IncompatibleConfiguration =>
			{
				writeln!(formatter,"IncompatibleConfiguration error: the configuration combines options that cannot go together.")?;
			},
			MissingDelays{router} =>
			{
				writeln!(formatter,"MissingDelays error: the delay configuration has no entry for router {}.",router)?;
			},
			Undetermined =>
			{
				writeln!(formatter,"Undetermined error: A generic error. The concrete error should be more specified.")?;
			},
		}
		Ok(())
	}
}

