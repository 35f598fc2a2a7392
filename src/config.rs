/*!

Reading the configuration of the router core.

A configuration is written in the language of [config_parser](crate::config_parser) and is read into `ConfigurationValue` trees. The router reads an object like

```ignore
IQRouter
{
	num_vcs: 4,
	buf_size: 16,
	buffer_policy: "shared",
	private_buf_size: 2,
	vc_allocator: "islip(2)",
	sw_allocator: "separable_input_first(matrix)",
	speculative: true,
}
```

Fields not given take the defaults of [RouterConfiguration::default]. Numeric fields where a negative value means "derive it from other fields" are read into `Option`s.

*/

use quantifiable_derive::Quantifiable;//the derive macro
use crate::config_parser::{self,ConfigurationValue,Token};
use crate::error::{Error,ErrorKind};
use crate::source_location;

/// Iterate the fields of a configuration object, checking its name.
/// `match_object_panic!(cv, "Name", value, "field" => expression, ...)` or with a list of accepted names `["A","B"]`.
/// Fields not listed produce a panic, as it usually means a typo in the configuration.
#[macro_export]
macro_rules! match_object_panic{
	($cv:expr, $name:literal, $valueid:ident) => {{
		$crate::match_object_panic!($cv,[$name],$valueid,)
	}};
	($cv:expr, $name:literal, $valueid:ident, $($key:literal => $arm:expr),* $(,)?) => {{
		$crate::match_object_panic!($cv,[$name],$valueid,$($key => $arm),*)
	}};
	($cv:expr, [$($name:literal),+], $valueid:ident, $($key:literal => $arm:expr),* $(,)?) => {{
		if let &$crate::config_parser::ConfigurationValue::Object(ref cv_name, ref cv_pairs)=$cv
		{
			if !( $( cv_name==$name )||+ )
			{
				panic!("A {} must be created from a `{}` object not `{}`",stringify!($($name)|+),stringify!($($name)|+),cv_name);
			}
			for &(ref name,ref $valueid) in cv_pairs
			{
				match name.as_ref()
				{
					$( $key => $arm, )*
					"legend_name" => (),
					_ => panic!("Nothing to do with field {} in {}",name,cv_name),
				}
			}
		}
		else
		{
			panic!("Trying to create a {} from a non-Object",stringify!($($name)|+));
		}
	}};
}

impl ConfigurationValue
{
	pub fn as_bool(&self) -> Result<bool,Error>
	{
		match self
		{
			&ConfigurationValue::True => Ok(true),
			&ConfigurationValue::False => Ok(false),
			//Flags are also accepted as numbers, with zero being false.
			&ConfigurationValue::Number(x) => Ok(x!=0.0),
			_ => Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("{} is not a boolean",self))),
		}
	}
	pub fn as_f64(&self) -> Result<f64,Error>
	{
		match self
		{
			&ConfigurationValue::Number(x) => Ok(x),
			_ => Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("{} is not a number",self))),
		}
	}
	pub fn as_i64(&self) -> Result<i64,Error>
	{
		self.as_f64().map(|x|x as i64)
	}
	/// Read a non-negative integer.
	pub fn as_usize(&self) -> Result<usize,Error>
	{
		let x=self.as_f64()?;
		if x<0.0
		{
			return Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("{} is negative",x)));
		}
		Ok(x as usize)
	}
	/// Read an integer where negative values mean that it is not given.
	pub fn as_optional_usize(&self) -> Result<Option<usize>,Error>
	{
		let x=self.as_f64()?;
		Ok( if x<0.0 { None } else { Some(x as usize) } )
	}
	pub fn as_str(&self) -> Result<&str,Error>
	{
		match self
		{
			&ConfigurationValue::Literal(ref s) => Ok(s),
			_ => Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("{} is not a literal",self))),
		}
	}
	pub fn as_array(&self) -> Result<&Vec<ConfigurationValue>,Error>
	{
		match self
		{
			&ConfigurationValue::Array(ref list) => Ok(list),
			_ => Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("{} is not an array",self))),
		}
	}
}

/// Parse a configuration text into its value.
pub fn parse_configuration(source:&str) -> Result<ConfigurationValue,Error>
{
	match config_parser::parse(source)
	{
		Ok(Token::Value(value)) => Ok(value),
		Ok(token) => Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("the configuration is not a value but {:?}",token))),
		Err(error) => Err(Error::new(source_location!(),ErrorKind::Undetermined).with_message(format!("could not parse the configuration: {:?}",error))),
	}
}

/// Split a name with optional parameters, such as `islip(2)` or `separable_input_first(tree(2,matrix))`.
/// Parameters are separated by top-level commas; nested parentheses are kept inside their parameter.
pub fn parse_name_and_parameters(text:&str) -> (&str,Vec<&str>)
{
	let text=text.trim();
	let open = match text.find('(')
	{
		Some(index) => index,
		None => return (text,vec![]),
	};
	let close = text.rfind(')').filter(|&index|index>open).unwrap_or(text.len());
	let name=text[..open].trim();
	let inner=&text[open+1..close];
	let mut parameters=vec![];
	let mut depth=0i32;
	let mut start=0;
	for (index,c) in inner.char_indices()
	{
		match c
		{
			'(' => depth+=1,
			')' => depth-=1,
			',' if depth==0 =>
			{
				parameters.push(inner[start..index].trim());
				start=index+1;
			},
			_ => (),
		}
	}
	let last=inner[start..].trim();
	if !last.is_empty() || !parameters.is_empty()
	{
		parameters.push(last);
	}
	(name,parameters)
}

/// The parameters of an input-queued router.
#[derive(Clone,Debug,Quantifiable)]
pub struct RouterConfiguration
{
	///Virtual channels per port.
	pub num_vcs: usize,
	///Slots per virtual channel, used when `buf_size` is not given.
	pub vc_buf_size: usize,
	///Slots per input port. `None` means `num_vcs*vc_buf_size`.
	pub buf_size: Option<usize>,
	///Name of the buffer sharing policy used to track the downstream buffers.
	pub buffer_policy: String,
	///Number of private buffers of the shared policies. `None` means one per virtual channel.
	pub private_bufs: Option<usize>,
	///Size of each private buffer. A single entry applies to all; `None` entries divide `buf_size` evenly.
	pub private_buf_size: Vec<Option<usize>>,
	pub private_buf_start_vc: Vec<usize>,
	pub private_buf_end_vc: Vec<usize>,
	///Limit of slots a single virtual channel can hold. `None` means `buf_size`.
	pub max_held_slots: Option<usize>,
	pub feedback_aging_scale: u32,
	pub feedback_offset: i64,
	pub wait_for_tail_credit: bool,
	pub vc_busy_when_full: bool,
	pub vc_prioritize_empty: bool,
	pub vc_priority_donation: bool,
	pub vc_shuffle_requests: bool,
	///How the virtual channels compute their priority: `none`, `local_age`, `queue_length`, `hop_count` or anything else for externally given priorities.
	pub priority: String,
	pub speculative: bool,
	pub spec_check_elig: bool,
	pub spec_check_cred: bool,
	pub spec_mask_by_reqs: bool,
	pub spec_sw_allocator: String,
	pub vc_allocator: String,
	pub sw_allocator: String,
	pub arb_type: String,
	pub alloc_iters: Option<usize>,
	pub noq: bool,
	pub hold_switch_for_packet: bool,
	///Capacity of the queue at each output port. `None` for unbounded.
	pub output_buffer_size: Option<usize>,
	pub input_speedup: usize,
	pub output_speedup: usize,
	///Number of traffic classes, for the piggybacked allocation offsets.
	pub classes: usize,
	pub routing_delay: u64,
	pub vc_alloc_delay: u64,
	pub sw_alloc_delay: u64,
	pub st_final_delay: u64,
	pub credit_delay: u64,
}

impl Default for RouterConfiguration
{
	fn default() -> RouterConfiguration
	{
		RouterConfiguration{
			num_vcs: 4,
			vc_buf_size: 4,
			buf_size: None,
			buffer_policy: "private".to_string(),
			private_bufs: None,
			private_buf_size: vec![None],
			private_buf_start_vc: vec![],
			private_buf_end_vc: vec![],
			max_held_slots: None,
			feedback_aging_scale: 1,
			feedback_offset: 0,
			wait_for_tail_credit: false,
			vc_busy_when_full: false,
			vc_prioritize_empty: false,
			vc_priority_donation: false,
			vc_shuffle_requests: false,
			priority: "none".to_string(),
			speculative: false,
			spec_check_elig: true,
			spec_check_cred: true,
			spec_mask_by_reqs: false,
			spec_sw_allocator: "prio".to_string(),
			vc_allocator: "islip".to_string(),
			sw_allocator: "islip".to_string(),
			arb_type: "round_robin".to_string(),
			alloc_iters: None,
			noq: false,
			hold_switch_for_packet: false,
			output_buffer_size: None,
			input_speedup: 1,
			output_speedup: 1,
			classes: 1,
			routing_delay: 1,
			vc_alloc_delay: 1,
			sw_alloc_delay: 1,
			st_final_delay: 1,
			credit_delay: 0,
		}
	}
}

fn read_string(value:&ConfigurationValue, field:&str) -> String
{
	match value
	{
		&ConfigurationValue::Literal(ref s) => s.to_string(),
		_ => panic!("bad value for {}",field),
	}
}

impl RouterConfiguration
{
	pub fn from_cv(cv:&ConfigurationValue) -> RouterConfiguration
	{
		let mut config=RouterConfiguration::default();
		match_object_panic!(cv,["IQRouter","InputQueued"],value,
			"num_vcs" => config.num_vcs=value.as_usize().expect("bad value for num_vcs"),
			"vc_buf_size" => config.vc_buf_size=value.as_usize().expect("bad value for vc_buf_size"),
			"buf_size" => config.buf_size=value.as_optional_usize().expect("bad value for buf_size"),
			"buffer_policy" => config.buffer_policy=read_string(value,"buffer_policy"),
			"private_bufs" => config.private_bufs=value.as_optional_usize().expect("bad value for private_bufs"),
			"private_buf_size" => config.private_buf_size=match value
			{
				&ConfigurationValue::Number(_) => vec![value.as_optional_usize().expect("bad value for private_buf_size")],
				&ConfigurationValue::Array(ref list) => list.iter().map(|v|v.as_optional_usize().expect("bad value for private_buf_size")).collect(),
				_ => panic!("bad value for private_buf_size"),
			},
			"private_buf_start_vc" => config.private_buf_start_vc=value.as_array().expect("bad value for private_buf_start_vc").iter().map(|v|v.as_usize().expect("bad value for private_buf_start_vc")).collect(),
			"private_buf_end_vc" => config.private_buf_end_vc=value.as_array().expect("bad value for private_buf_end_vc").iter().map(|v|v.as_usize().expect("bad value for private_buf_end_vc")).collect(),
			"max_held_slots" => config.max_held_slots=value.as_optional_usize().expect("bad value for max_held_slots"),
			"feedback_aging_scale" => config.feedback_aging_scale=value.as_usize().expect("bad value for feedback_aging_scale") as u32,
			"feedback_offset" => config.feedback_offset=value.as_i64().expect("bad value for feedback_offset"),
			"wait_for_tail_credit" => config.wait_for_tail_credit=value.as_bool().expect("bad value for wait_for_tail_credit"),
			"vc_busy_when_full" => config.vc_busy_when_full=value.as_bool().expect("bad value for vc_busy_when_full"),
			"vc_prioritize_empty" => config.vc_prioritize_empty=value.as_bool().expect("bad value for vc_prioritize_empty"),
			"vc_priority_donation" => config.vc_priority_donation=value.as_bool().expect("bad value for vc_priority_donation"),
			"vc_shuffle_requests" => config.vc_shuffle_requests=value.as_bool().expect("bad value for vc_shuffle_requests"),
			"priority" => config.priority=read_string(value,"priority"),
			"speculative" => config.speculative=value.as_bool().expect("bad value for speculative"),
			"spec_check_elig" => config.spec_check_elig=value.as_bool().expect("bad value for spec_check_elig"),
			"spec_check_cred" => config.spec_check_cred=value.as_bool().expect("bad value for spec_check_cred"),
			"spec_mask_by_reqs" => config.spec_mask_by_reqs=value.as_bool().expect("bad value for spec_mask_by_reqs"),
			"spec_sw_allocator" => config.spec_sw_allocator=read_string(value,"spec_sw_allocator"),
			"vc_allocator" => config.vc_allocator=read_string(value,"vc_allocator"),
			"sw_allocator" => config.sw_allocator=read_string(value,"sw_allocator"),
			"arb_type" => config.arb_type=read_string(value,"arb_type"),
			"alloc_iters" => config.alloc_iters=value.as_optional_usize().expect("bad value for alloc_iters"),
			"noq" => config.noq=value.as_bool().expect("bad value for noq"),
			"hold_switch_for_packet" => config.hold_switch_for_packet=value.as_bool().expect("bad value for hold_switch_for_packet"),
			"output_buffer_size" => config.output_buffer_size=value.as_optional_usize().expect("bad value for output_buffer_size"),
			"input_speedup" => config.input_speedup=value.as_usize().expect("bad value for input_speedup"),
			"output_speedup" => config.output_speedup=value.as_usize().expect("bad value for output_speedup"),
			"classes" => config.classes=value.as_usize().expect("bad value for classes"),
			"routing_delay" => config.routing_delay=value.as_usize().expect("bad value for routing_delay") as u64,
			"vc_alloc_delay" => config.vc_alloc_delay=value.as_usize().expect("bad value for vc_alloc_delay") as u64,
			"sw_alloc_delay" => config.sw_alloc_delay=value.as_usize().expect("bad value for sw_alloc_delay") as u64,
			"st_final_delay" => config.st_final_delay=value.as_usize().expect("bad value for st_final_delay") as u64,
			"credit_delay" => config.credit_delay=value.as_usize().expect("bad value for credit_delay") as u64,
		);
		if config.input_speedup==0 || config.output_speedup==0
		{
			panic!("speedups must be positive");
		}
		config
	}
	///The number of slots of each input buffer.
	pub fn total_buffer_size(&self) -> usize
	{
		self.buf_size.unwrap_or(self.num_vcs*self.vc_buf_size)
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	#[test]
	fn names_and_parameters()
	{
		assert_eq!(parse_name_and_parameters("islip"),("islip",vec![]));
		assert_eq!(parse_name_and_parameters("islip(2)"),("islip",vec!["2"]));
		assert_eq!(parse_name_and_parameters("separable_input_first(tree(2,matrix))"),("separable_input_first",vec!["tree(2,matrix)"]));
		assert_eq!(parse_name_and_parameters("tree(4, matrix)"),("tree",vec!["4","matrix"]));
		assert_eq!(parse_name_and_parameters("wavefront()"),("wavefront",vec![]));
	}
	#[test]
	fn router_configuration_defaults_and_overrides()
	{
		let cv=parse_configuration("IQRouter{ num_vcs:2, buf_size:-1, vc_buf_size:8, private_buf_size:[2,3], speculative:true, vc_allocator:\"pim(3)\" }").unwrap();
		let config=RouterConfiguration::from_cv(&cv);
		assert_eq!(config.num_vcs,2);
		assert_eq!(config.buf_size,None);
		assert_eq!(config.total_buffer_size(),16);
		assert_eq!(config.private_buf_size,vec![Some(2),Some(3)]);
		assert!(config.speculative);
		assert_eq!(config.vc_allocator,"pim(3)");
		assert_eq!(config.sw_allocator,"islip");
		assert_eq!(config.routing_delay,1);
		assert_eq!(config.credit_delay,0);
	}
	#[test]
	fn printed_configuration_is_parsed_back()
	{
		let cv=parse_configuration("DelayConfig{ routers:2, sw_alloc_delays:[1,2], asynchronous:[false,true], gating:PowerGating{mode:1}, name:\"x\", empty:Nothing{} }").unwrap();
		let printed=format!("{}",cv);
		assert_eq!(parse_configuration(&printed).unwrap(),cv);
	}
	#[test]
	#[should_panic]
	fn unknown_field_panics()
	{
		let cv=parse_configuration("IQRouter{ num_vc:2 }").unwrap();
		RouterConfiguration::from_cv(&cv);
	}
	#[test]
	fn value_accessors()
	{
		assert_eq!(ConfigurationValue::Number(3.0).as_usize().unwrap(),3);
		assert!(ConfigurationValue::Number(-3.0).as_usize().is_err());
		assert_eq!(ConfigurationValue::Number(-3.0).as_optional_usize().unwrap(),None);
		assert!(ConfigurationValue::Number(1.0).as_bool().unwrap());
		assert!(!ConfigurationValue::False.as_bool().unwrap());
		assert_eq!(ConfigurationValue::Literal("x".to_string()).as_str().unwrap(),"x");
	}
}

